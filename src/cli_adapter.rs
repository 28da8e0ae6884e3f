use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::application::incident_log::{IncidentLog, IncidentLogError};
use crate::config::app_config::AppConfig;
use crate::config::sheets_config::{resolve_sheet_config, EnvSnapshot, DEFAULT_SECRETS_FILE};
use crate::domain::incident::{NewIncident, Process, Severity};
use crate::domain::record_table::{RecordFilter, RecordTable};

#[derive(Debug)]
pub enum Command {
    Append(NewIncident),
    History(RecordFilter),
    Check,
    Help,
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("invalid command: {details}")]
    InvalidCommand { details: String },
}

const USAGE: &str = "\
Usage:
  med-error-log append --date YYYY-MM-DD --time HH:MM --process <process> \\
                       --drug <name> --severity <A-I> --details <text>
  med-error-log history [--from YYYY-MM-DD] [--to YYYY-MM-DD] \\
                        [--severity C,D,...] [--process <p1>,<p2>] [--keyword <text>]
  med-error-log check
  med-error-log help";

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == name)
        .and_then(|index| args.get(index + 1))
        .map(String::as_str)
}

fn required_flag<'a>(args: &'a [String], name: &str) -> Result<&'a str, CommandError> {
    flag_value(args, name).ok_or_else(|| CommandError::InvalidCommand {
        details: format!("{name} is required"),
    })
}

fn parse_date(value: &str, flag: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| CommandError::InvalidCommand {
        details: format!("{flag} must be YYYY-MM-DD, got '{value}'"),
    })
}

fn parse_process(value: &str) -> Result<Process, CommandError> {
    Process::from_str(value).map_err(|_| {
        let options: Vec<String> = Process::iter().map(|p| p.to_string()).collect();
        CommandError::InvalidCommand {
            details: format!("'{value}' is not a process option ({})", options.join(", ")),
        }
    })
}

fn parse_severity(value: &str) -> Result<Severity, CommandError> {
    Severity::from_str(value).map_err(|_| CommandError::InvalidCommand {
        details: format!("'{value}' is not a severity code (A-I)"),
    })
}

pub fn parse_args(args: &[String]) -> Result<Command, CommandError> {
    match args.get(1).map(String::as_str) {
        Some("append") => {
            let date = required_flag(args, "--date")?;
            let time = required_flag(args, "--time")?;
            let event_time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| {
                CommandError::InvalidCommand {
                    details: format!("--time must be HH:MM, got '{time}'"),
                }
            })?;

            Ok(Command::Append(NewIncident {
                event_date: parse_date(date, "--date")?,
                event_time,
                process: parse_process(required_flag(args, "--process")?)?,
                drug_name: required_flag(args, "--drug")?.to_string(),
                severity: parse_severity(required_flag(args, "--severity")?)?,
                details: required_flag(args, "--details")?.to_string(),
            }))
        }
        Some("history") => {
            let mut filter = RecordFilter::default();
            if let Some(from) = flag_value(args, "--from") {
                filter.date_from = Some(parse_date(from, "--from")?);
            }
            if let Some(to) = flag_value(args, "--to") {
                filter.date_to = Some(parse_date(to, "--to")?);
            }
            if let Some(severities) = flag_value(args, "--severity") {
                filter.severities = severities
                    .split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(parse_severity)
                    .collect::<Result<_, _>>()?;
            }
            if let Some(processes) = flag_value(args, "--process") {
                filter.processes = processes
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(parse_process)
                    .collect::<Result<_, _>>()?;
            }
            filter.keyword = flag_value(args, "--keyword").map(str::to_string);
            Ok(Command::History(filter))
        }
        Some("check") => Ok(Command::Check),
        Some("help") | None => Ok(Command::Help),
        Some(other) => Err(CommandError::InvalidCommand {
            details: format!("unknown command '{other}', see 'med-error-log help'"),
        }),
    }
}

pub struct CliAdapter {
    app: AppConfig,
}

impl std::fmt::Debug for CliAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliAdapter").field("app", &self.app).finish()
    }
}

impl CliAdapter {
    pub fn new(app: AppConfig) -> Self {
        CliAdapter { app }
    }

    #[instrument(skip(self, args))]
    pub async fn run(&self, args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
        match parse_args(&args)? {
            Command::Help => {
                println!("{}", self.app.title);
                println!("{USAGE}");
                Ok(())
            }
            Command::Check => {
                self.check();
                Ok(())
            }
            Command::Append(incident) => self.append(incident).await,
            Command::History(filter) => self.history(filter).await,
        }
    }

    fn incident_log(&self) -> Result<IncidentLog, Box<dyn std::error::Error>> {
        let resolved = resolve_sheet_config(DEFAULT_SECRETS_FILE, &EnvSnapshot::from_process_env())?;
        Ok(IncidentLog::new(self.app.clone(), resolved))
    }

    /// Connection-status report; resolver errors are printed verbatim, they
    /// are the diagnostic.
    fn check(&self) {
        match resolve_sheet_config(DEFAULT_SECRETS_FILE, &EnvSnapshot::from_process_env()) {
            Ok(resolved) => {
                println!("credentials / sheet configured");
                println!("worksheet: {}", resolved.worksheet);
                println!("sheet URL: {}", resolved.spreadsheet_url);
            }
            Err(err) => {
                println!("configuration incomplete");
                println!("{err}");
            }
        }
    }

    async fn append(&self, incident: NewIncident) -> Result<(), Box<dyn std::error::Error>> {
        let log = self.incident_log()?;
        match log.append(&incident).await {
            Ok(()) => {
                info!("incident recorded");
                println!("incident recorded");
                Ok(())
            }
            Err(report) => match report.current_context() {
                IncidentLogError::Validation(errors) => {
                    for validation_error in errors {
                        println!("error: {validation_error}");
                    }
                    Err("validation failed".into())
                }
                IncidentLogError::Sheet => {
                    error!("append failed: {report:?}");
                    Err(format!("failed to record incident: {report:?}").into())
                }
            },
        }
    }

    async fn history(&self, filter: RecordFilter) -> Result<(), Box<dyn std::error::Error>> {
        let log = self.incident_log()?;
        let table = log.records().await.map_err(|report| {
            error!("history read failed: {report:?}");
            format!("failed to read history: {report:?}")
        })?;

        if table.is_empty() {
            println!("no records yet");
            return Ok(());
        }

        let filtered = table.filtered(&filter);
        print_table(&filtered);
        println!();
        println!("total records: {}", table.len());
        println!("matching filter: {}", filtered.len());
        println!("severity E-I: {}", filtered.high_severity_count());
        Ok(())
    }
}

fn print_table(table: &RecordTable) {
    println!("{}", RecordTable::columns().join("\t"));
    for row in table.rows() {
        println!("{}", row.join("\t"));
    }
}
