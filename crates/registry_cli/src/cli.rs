//! Command-line surface of the `registry` binary.
//!
//! Each subcommand maps onto one facade call. Text fields passed as empty
//! strings to `update` commands keep the stored value.

use clap::{Args, Parser, Subcommand};
use registry_core::{OrderStatus, RecordId};
use std::path::PathBuf;

/// Registry of people, orders and their shared addresses and shipments.
#[derive(Parser, Debug)]
#[command(name = "registry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(long, global = true, env = "REGISTRY_DB", default_value = "registry.sqlite3")]
    pub db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "REGISTRY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rotating log files; stderr when unset
    #[arg(long, global = true, env = "REGISTRY_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage people
    #[command(subcommand)]
    Person(PersonCommand),

    /// Manage addresses
    #[command(subcommand)]
    Address(AddressCommand),

    /// Manage orders
    #[command(subcommand)]
    Order(OrderCommand),

    /// Manage shipments
    #[command(subcommand)]
    Shipment(ShipmentCommand),
}

#[derive(Subcommand, Debug)]
pub enum PersonCommand {
    /// Create a person, optionally with a new or existing address
    Add {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        national_id: String,
        #[command(flatten)]
        address: NewAddressArgs,
        /// Reference an existing address instead of creating one
        #[arg(long, conflicts_with_all = ["street", "number"])]
        address_id: Option<RecordId>,
    },
    /// Show one person
    Get { id: RecordId },
    /// List active people
    List,
    /// Find a person by national id
    Find { national_id: String },
    /// Search first and last names
    Search { filter: String },
    /// Edit person fields; the address is not touched
    Update {
        id: RecordId,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        national_id: Option<String>,
    },
    /// Soft-delete a person
    Delete { id: RecordId },
    /// Point a person at an existing address
    Attach { id: RecordId, address_id: RecordId },
    /// Edit the address this person references (shared by all its owners)
    EditAddress {
        id: RecordId,
        #[command(flatten)]
        fields: AddressFieldArgs,
    },
    /// Clear the person's address and delete it once unreferenced
    Detach { id: RecordId, address_id: RecordId },
}

#[derive(Subcommand, Debug)]
pub enum AddressCommand {
    /// Create a stand-alone address
    Add {
        #[arg(long)]
        street: String,
        #[arg(long)]
        number: String,
    },
    Get {
        id: RecordId,
    },
    List,
    /// Edit an address; every person referencing it sees the change
    Update {
        id: RecordId,
        #[command(flatten)]
        fields: AddressFieldArgs,
    },
    /// Soft-delete without checking references (may leave dangling links)
    DeleteUnsafe {
        id: RecordId,
    },
}

#[derive(Subcommand, Debug)]
pub enum OrderCommand {
    /// Create an order, optionally with a new or existing shipment
    Add {
        #[arg(long)]
        order_number: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        quantity: i64,
        #[arg(long)]
        unit_price: f64,
        #[arg(long, value_parser = parse_status)]
        status: Option<OrderStatus>,
        #[command(flatten)]
        shipment: NewShipmentArgs,
        /// Reference an existing shipment instead of creating one
        #[arg(long, conflicts_with_all = ["destination", "ship_date", "carrier"])]
        shipment_id: Option<RecordId>,
    },
    Get {
        id: RecordId,
    },
    List,
    /// Find an order by order number
    Find {
        order_number: String,
    },
    /// Exact order number or description substring
    Search {
        filter: String,
    },
    /// Edit order fields; the shipment is not touched
    Update {
        id: RecordId,
        #[arg(long)]
        order_number: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        quantity: Option<i64>,
        #[arg(long)]
        unit_price: Option<f64>,
        #[arg(long, value_parser = parse_status)]
        status: Option<OrderStatus>,
    },
    Delete {
        id: RecordId,
    },
    Attach {
        id: RecordId,
        shipment_id: RecordId,
    },
    /// Edit the shipment this order references (shared by all its owners)
    EditShipment {
        id: RecordId,
        #[command(flatten)]
        fields: ShipmentFieldArgs,
    },
    /// Clear the order's shipment and delete it once unreferenced
    Detach {
        id: RecordId,
        shipment_id: RecordId,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShipmentCommand {
    Add {
        #[arg(long)]
        destination: String,
        /// YYYY-MM-DD
        #[arg(long)]
        ship_date: String,
        #[arg(long)]
        carrier: Option<String>,
    },
    Get {
        id: RecordId,
    },
    List,
    Update {
        id: RecordId,
        #[command(flatten)]
        fields: ShipmentFieldArgs,
    },
    DeleteUnsafe {
        id: RecordId,
    },
}

/// New address carried by `person add`.
#[derive(Args, Debug)]
pub struct NewAddressArgs {
    #[arg(long, requires = "number")]
    pub street: Option<String>,
    #[arg(long, requires = "street")]
    pub number: Option<String>,
}

/// New shipment carried by `order add`.
#[derive(Args, Debug)]
pub struct NewShipmentArgs {
    #[arg(long, requires = "ship_date")]
    pub destination: Option<String>,
    #[arg(long, requires = "destination")]
    pub ship_date: Option<String>,
    #[arg(long, requires = "destination")]
    pub carrier: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddressFieldArgs {
    #[arg(long)]
    pub street: Option<String>,
    #[arg(long)]
    pub number: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShipmentFieldArgs {
    #[arg(long)]
    pub destination: Option<String>,
    #[arg(long)]
    pub ship_date: Option<String>,
    #[arg(long)]
    pub carrier: Option<String>,
}

fn parse_status(value: &str) -> Result<OrderStatus, String> {
    OrderStatus::parse(value).ok_or_else(|| {
        format!("unknown status `{value}`; expected pending|confirmed|shipped|delivered|cancelled")
    })
}
