use super::ledger::Owner;
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use std::{fs::File, io::Read, path::Path, str::FromStr};
use thiserror::Error;

pub type DriverId = String;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Failed to open roster file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed roster CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Roster line {line}: missing {field}")]
    MissingField { line: usize, field: &'static str },

    #[error("Roster line {line}: unknown status \"{value}\"")]
    UnknownStatus { line: usize, value: String },

    #[error("Duplicate driver id in roster: {0}")]
    DuplicateId(String),

    #[error("Duplicate driver name in roster: {0}")]
    DuplicateName(String),

    #[error("Driver id \"{0}\" is reserved for the unassigned pool")]
    ReservedId(String),

    #[error("Roster is empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Available,
    OnRoute,
    Offline,
}

impl FromStr for DriverStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "" | "available" => Ok(DriverStatus::Available),
            "on_route" | "busy" => Ok(DriverStatus::OnRoute),
            "offline" => Ok(DriverStatus::Offline),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub display_color: String,
    pub status: DriverStatus,
}

impl Driver {
    pub fn new(id: &str, name: &str, display_color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            display_color: display_color.to_string(),
            status: DriverStatus::Available,
        }
    }
}

/// The fixed set of drivers for a session.
#[derive(Debug, Clone)]
pub struct Roster {
    drivers: Vec<Driver>,
}

impl Roster {
    pub fn new(drivers: Vec<Driver>) -> Result<Self, RosterError> {
        if drivers.is_empty() {
            return Err(RosterError::Empty);
        }
        for (i, driver) in drivers.iter().enumerate() {
            if driver.id == Owner::UNASSIGNED_LIST_ID {
                return Err(RosterError::ReservedId(driver.id.clone()));
            }
            if drivers[..i].iter().any(|d| d.id == driver.id) {
                return Err(RosterError::DuplicateId(driver.id.clone()));
            }
            // markers and seeding resolve drivers by name
            let name = driver.name.trim();
            if drivers[..i]
                .iter()
                .any(|d| d.name.trim().eq_ignore_ascii_case(name))
            {
                return Err(RosterError::DuplicateName(driver.name.clone()));
            }
        }
        Ok(Self { drivers })
    }

    /// Three-driver roster used when no CSV is configured.
    pub fn builtin() -> Self {
        Self {
            drivers: vec![
                Driver::new("driver-a", "Alice", "#e6194b"),
                Driver::new("driver-b", "Bruno", "#3cb44b"),
                Driver::new("driver-c", "Chloe", "#4363d8"),
            ],
        }
    }

    /// Loads a roster from a CSV file with an `id,name,color[,status]` header.
    pub fn from_csv<P: AsRef<Path>>(csv_path: P) -> Result<Self, RosterError> {
        let file = File::open(csv_path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RosterError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut drivers = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            // +2: 1-based, after the header
            let line = i + 2;
            let get = |index: usize, field: &'static str| {
                record
                    .get(index)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .ok_or(RosterError::MissingField { line, field })
            };
            let status_raw = record.get(3).unwrap_or_default();
            let status = status_raw
                .parse::<DriverStatus>()
                .map_err(|_| RosterError::UnknownStatus {
                    line,
                    value: status_raw.to_string(),
                })?;

            drivers.push(Driver {
                id: get(0, "id")?,
                name: get(1, "name")?,
                display_color: get(2, "color")?,
                status,
            });
        }

        log::info!("Loaded {} drivers from roster CSV", drivers.len());
        Self::new(drivers)
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn get(&self, id: &str) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Case-insensitive display-name match, the only link the task store keeps.
    pub fn find_by_name(&self, name: &str) -> Option<&Driver> {
        let name = name.trim();
        self.drivers
            .iter()
            .find(|d| d.name.trim().eq_ignore_ascii_case(name))
    }
}
