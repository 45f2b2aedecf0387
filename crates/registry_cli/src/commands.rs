//! Subcommand execution and output rendering.

use crate::cli::{
    AddressCommand, AddressFieldArgs, Cli, Commands, OrderCommand, PersonCommand,
    ShipmentCommand, ShipmentFieldArgs,
};
use log::info;
use registry_core::{
    open_db, Address, AddressPatch, DbError, DetachOutcome, Order, OrderPatch, OrderService,
    Owner, Person, PersonPatch, PersonService, RecordId, RepoError, ServiceError, Shipment,
    ShipmentPatch, SqliteAddressRepository, SqliteOrderRepository, SqlitePersonRepository,
    SqliteShipmentRepository,
};
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum CliError {
    Logging(String),
    Db(DbError),
    Repo(RepoError),
    Service(ServiceError),
    Output(serde_json::Error),
}

impl CliError {
    /// Tolerated residue, reported as a warning rather than a failure.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Service(err) if err.is_tolerated())
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Repo(err) => write!(f, "storage error: {err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "failed to render output: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(_) => None,
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Service(err) => Some(err),
            Self::Output(err) => Some(err),
        }
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

type CliResult = Result<(), CliError>;

/// One-line human rendering.
trait Describe {
    fn describe(&self) -> String;
}

impl Describe for Address {
    fn describe(&self) -> String {
        format!(
            "address #{} {} {}{}",
            display_id(self.id),
            self.street,
            self.number,
            inactive_marker(self.is_active)
        )
    }
}

impl Describe for Person {
    fn describe(&self) -> String {
        let address = self
            .address
            .as_ref()
            .map(|address| format!(" -> {}", address.describe()))
            .unwrap_or_default();
        format!(
            "person #{} {} [{}]{address}",
            display_id(self.id),
            self.full_name(),
            self.national_id
        )
    }
}

impl Describe for Shipment {
    fn describe(&self) -> String {
        let carrier = self
            .carrier
            .as_deref()
            .map(|carrier| format!(" via {carrier}"))
            .unwrap_or_default();
        format!(
            "shipment #{} to {} on {}{carrier}{}",
            display_id(self.id),
            self.destination,
            self.ship_date,
            inactive_marker(self.is_active)
        )
    }
}

impl Describe for Order {
    fn describe(&self) -> String {
        let shipment = self
            .shipment
            .as_ref()
            .map(|shipment| format!(" -> {}", shipment.describe()))
            .unwrap_or_default();
        format!(
            "order #{} {} \"{}\" {} x {:.2} = {:.2} ({}){shipment}",
            display_id(self.id),
            self.order_number,
            self.description,
            self.quantity,
            self.unit_price,
            self.total(),
            self.status
        )
    }
}

fn display_id(id: Option<RecordId>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

fn inactive_marker(is_active: bool) -> &'static str {
    if is_active {
        ""
    } else {
        " (inactive)"
    }
}

#[derive(Debug, Serialize)]
struct DetachReport<'a, O> {
    owner: &'a O,
    linked_id: RecordId,
    linked_deleted: bool,
    remaining_referrers: usize,
}

struct Output {
    json: bool,
}

impl Output {
    fn one<T: Serialize + Describe>(&self, value: &T) -> CliResult {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", value.describe());
        }
        Ok(())
    }

    fn maybe<T: Serialize + Describe>(&self, value: Option<&T>, what: &str) -> CliResult {
        match value {
            Some(value) => self.one(value),
            None if self.json => {
                println!("null");
                Ok(())
            }
            None => {
                println!("no active {what} found");
                Ok(())
            }
        }
    }

    fn many<T: Serialize + Describe>(&self, values: &[T]) -> CliResult {
        if self.json {
            println!("{}", serde_json::to_string_pretty(values)?);
        } else if values.is_empty() {
            println!("no results");
        } else {
            for value in values {
                println!("{}", value.describe());
            }
        }
        Ok(())
    }

    fn done(&self, message: &str) -> CliResult {
        if self.json {
            println!("{}", serde_json::json!({ "status": "ok", "message": message }));
        } else {
            println!("{message}");
        }
        Ok(())
    }

    fn detach<O: Serialize + Describe>(
        &self,
        outcome: &DetachOutcome<O>,
        linked_id: RecordId,
        linked_entity: &str,
    ) -> CliResult {
        if self.json {
            let report = DetachReport {
                owner: &outcome.owner,
                linked_id,
                linked_deleted: outcome.linked_deleted,
                remaining_referrers: outcome.remaining_referrers,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", outcome.owner.describe());
            if outcome.linked_deleted {
                println!("{linked_entity} #{linked_id} deleted");
            } else {
                println!(
                    "{linked_entity} #{linked_id} kept: still referenced by {} other record(s)",
                    outcome.remaining_referrers
                );
            }
        }
        Ok(())
    }
}

/// Opens the database and runs the selected subcommand.
pub fn run(cli: Cli) -> CliResult {
    let conn = open_db(&cli.db)?;
    let output = Output { json: cli.json };
    info!("event=cli_command module=cli status=start");

    match cli.command {
        Commands::Person(command) => run_person(&conn, &output, command),
        Commands::Address(command) => run_address(&conn, &output, command),
        Commands::Order(command) => run_order(&conn, &output, command),
        Commands::Shipment(command) => run_shipment(&conn, &output, command),
    }
}

fn person_service(
    conn: &Connection,
) -> Result<PersonService<SqlitePersonRepository<'_>, SqliteAddressRepository<'_>>, CliError> {
    Ok(PersonService::new(
        SqlitePersonRepository::try_new(conn)?,
        SqliteAddressRepository::try_new(conn)?,
    ))
}

fn order_service(
    conn: &Connection,
) -> Result<OrderService<SqliteOrderRepository<'_>, SqliteShipmentRepository<'_>>, CliError> {
    Ok(OrderService::new(
        SqliteOrderRepository::try_new(conn)?,
        SqliteShipmentRepository::try_new(conn)?,
    ))
}

fn address_patch(fields: AddressFieldArgs) -> AddressPatch {
    AddressPatch {
        street: fields.street,
        number: fields.number,
    }
}

fn shipment_patch(fields: ShipmentFieldArgs) -> ShipmentPatch {
    ShipmentPatch {
        destination: fields.destination,
        ship_date: fields.ship_date,
        carrier: fields.carrier,
    }
}

fn run_person(conn: &Connection, output: &Output, command: PersonCommand) -> CliResult {
    let service = person_service(conn)?;

    match command {
        PersonCommand::Add {
            first_name,
            last_name,
            national_id,
            address,
            address_id,
        } => {
            let mut person = Person::new(first_name, last_name, national_id);
            if let Some(address_id) = address_id {
                let existing = service.require_address(address_id)?;
                person.set_linked(Some(existing));
            } else if let (Some(street), Some(number)) = (address.street, address.number) {
                person = person.with_address(Address::new(street, number));
            }
            output.one(&service.create_person(person)?)
        }
        PersonCommand::Get { id } => output.maybe(service.get_person(id)?.as_ref(), "person"),
        PersonCommand::List => output.many(&service.list_people()?),
        PersonCommand::Find { national_id } => output.maybe(
            service.find_by_national_id(&national_id)?.as_ref(),
            "person",
        ),
        PersonCommand::Search { filter } => output.many(&service.search_people(&filter)?),
        PersonCommand::Update {
            id,
            first_name,
            last_name,
            national_id,
        } => {
            let patch = PersonPatch {
                first_name,
                last_name,
                national_id,
            };
            output.one(&service.update_person(id, &patch)?)
        }
        PersonCommand::Delete { id } => {
            service.delete_person(id)?;
            output.done(&format!("person #{id} deleted"))
        }
        PersonCommand::Attach { id, address_id } => {
            output.one(&service.attach_address(id, address_id)?)
        }
        PersonCommand::EditAddress { id, fields } => {
            output.one(&service.update_person_address(id, &address_patch(fields))?)
        }
        PersonCommand::Detach { id, address_id } => {
            let outcome = service.detach_and_delete_address(id, address_id)?;
            output.detach(&outcome, address_id, "address")
        }
    }
}

fn run_address(conn: &Connection, output: &Output, command: AddressCommand) -> CliResult {
    let service = person_service(conn)?;

    match command {
        AddressCommand::Add { street, number } => {
            output.one(&service.create_address(Address::new(street, number))?)
        }
        AddressCommand::Get { id } => output.maybe(service.get_address(id)?.as_ref(), "address"),
        AddressCommand::List => output.many(&service.list_addresses()?),
        AddressCommand::Update { id, fields } => {
            output.one(&service.update_address(id, &address_patch(fields))?)
        }
        AddressCommand::DeleteUnsafe { id } => {
            service.delete_address_unsafe(id)?;
            output.done(&format!(
                "address #{id} deleted without reference check"
            ))
        }
    }
}

fn run_order(conn: &Connection, output: &Output, command: OrderCommand) -> CliResult {
    let service = order_service(conn)?;

    match command {
        OrderCommand::Add {
            order_number,
            description,
            quantity,
            unit_price,
            status,
            shipment,
            shipment_id,
        } => {
            let mut order = Order::new(order_number, description, quantity, unit_price);
            if let Some(status) = status {
                order.status = status;
            }
            if let Some(shipment_id) = shipment_id {
                let existing = service.require_shipment(shipment_id)?;
                order.set_linked(Some(existing));
            } else if let (Some(destination), Some(ship_date)) =
                (shipment.destination, shipment.ship_date)
            {
                let mut new_shipment = Shipment::new(destination, ship_date);
                new_shipment.carrier = shipment.carrier;
                order = order.with_shipment(new_shipment);
            }
            output.one(&service.create_order(order)?)
        }
        OrderCommand::Get { id } => output.maybe(service.get_order(id)?.as_ref(), "order"),
        OrderCommand::List => output.many(&service.list_orders()?),
        OrderCommand::Find { order_number } => output.maybe(
            service.find_by_order_number(&order_number)?.as_ref(),
            "order",
        ),
        OrderCommand::Search { filter } => output.many(&service.search_orders(&filter)?),
        OrderCommand::Update {
            id,
            order_number,
            description,
            quantity,
            unit_price,
            status,
        } => {
            let patch = OrderPatch {
                order_number,
                description,
                quantity,
                unit_price,
                status,
            };
            output.one(&service.update_order(id, &patch)?)
        }
        OrderCommand::Delete { id } => {
            service.delete_order(id)?;
            output.done(&format!("order #{id} deleted"))
        }
        OrderCommand::Attach { id, shipment_id } => {
            output.one(&service.attach_shipment(id, shipment_id)?)
        }
        OrderCommand::EditShipment { id, fields } => {
            output.one(&service.update_order_shipment(id, &shipment_patch(fields))?)
        }
        OrderCommand::Detach { id, shipment_id } => {
            let outcome = service.detach_and_delete_shipment(id, shipment_id)?;
            output.detach(&outcome, shipment_id, "shipment")
        }
    }
}

fn run_shipment(conn: &Connection, output: &Output, command: ShipmentCommand) -> CliResult {
    let service = order_service(conn)?;

    match command {
        ShipmentCommand::Add {
            destination,
            ship_date,
            carrier,
        } => {
            let mut shipment = Shipment::new(destination, ship_date);
            shipment.carrier = carrier;
            output.one(&service.create_shipment(shipment)?)
        }
        ShipmentCommand::Get { id } => {
            output.maybe(service.get_shipment(id)?.as_ref(), "shipment")
        }
        ShipmentCommand::List => output.many(&service.list_shipments()?),
        ShipmentCommand::Update { id, fields } => {
            output.one(&service.update_shipment(id, &shipment_patch(fields))?)
        }
        ShipmentCommand::DeleteUnsafe { id } => {
            service.delete_shipment_unsafe(id)?;
            output.done(&format!(
                "shipment #{id} deleted without reference check"
            ))
        }
    }
}
