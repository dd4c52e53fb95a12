use clap::{Args, Subcommand};

/// One operation against the opened table.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print matching rows.
    Select {
        /// Column to output (repeatable, default: all columns).
        #[arg(short, long = "column")]
        columns: Vec<String>,

        #[command(flatten)]
        filter: RowFilter,
    },
    /// Insert one row; the first field is the primary key.
    Insert {
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Replace the row sharing the first field's primary key.
    Update {
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Delete matching rows.
    Delete {
        #[command(flatten)]
        filter: RowFilter,

        /// Delete every row.
        #[arg(long, conflicts_with_all = ["key", "condition"])]
        all: bool,
    },
    /// List primary keys in file order.
    Keys,
    /// Print the raw table file.
    Dump,
}

/// Row selection shared by SELECT and DELETE.
#[derive(Args, Debug, Default)]
pub struct RowFilter {
    /// Match the row with this primary key.
    #[arg(short, long, conflicts_with = "condition")]
    pub key: Option<String>,

    /// Match rows where COLUMN equals VALUE.
    #[arg(short = 'w', long = "where", value_name = "COLUMN=VALUE", value_parser = parse_condition)]
    pub condition: Option<(String, String)>,
}

impl RowFilter {
    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.condition.is_none()
    }
}

fn parse_condition(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, value)) if !column.is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected COLUMN=VALUE, got '{s}'")),
    }
}
