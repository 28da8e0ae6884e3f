use chrono::{NaiveDate, NaiveTime};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

/// Column names of the backing worksheet, in header order.
///
/// The header row of the worksheet must always equal [`schema::ALL`]; the
/// accessor repairs it on open if it diverges.
pub mod schema {
    pub const RECORDED_AT: &str = "เวลาบันทึกระบบ";
    pub const UNIT_NAME: &str = "หน่วยงาน";
    pub const REPORTER: &str = "ผู้รายงาน";
    pub const EVENT_DATE: &str = "วันที่เกิดเหตุ";
    pub const EVENT_TIME: &str = "เวลาเกิดเหตุ";
    pub const PROCESS: &str = "กระบวนการที่เกิด";
    pub const DRUG_NAME: &str = "ชื่อยา";
    pub const SEVERITY: &str = "ระดับความรุนแรง";
    pub const DETAILS: &str = "รายละเอียดเหตุการณ์";

    pub const ALL: [&str; 9] = [
        RECORDED_AT,
        UNIT_NAME,
        REPORTER,
        EVENT_DATE,
        EVENT_TIME,
        PROCESS,
        DRUG_NAME,
        SEVERITY,
        DETAILS,
    ];
}

/// Stage of the medication-use process at which the incident occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Process {
    #[strum(serialize = "สั่งใช้ยา")]
    Prescribing,
    #[strum(serialize = "จัด/จ่ายยา")]
    Dispensing,
    #[strum(serialize = "ให้ยา")]
    Administration,
    #[strum(serialize = "ผู้ป่วยใช้ยาผิดวิธี")]
    PatientMisuse,
}

/// NCC MERP severity codes, ordered A (no error) through I (death).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, EnumIter)]
pub enum Severity {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
}

impl Severity {
    /// E through I, the codes counted by the high-severity metric.
    pub fn is_high(&self) -> bool {
        *self >= Severity::E
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("drug name must not be blank")]
    DrugNameBlank,
    #[error("incident details must not be blank")]
    DetailsBlank,
}

/// A not-yet-persisted incident as collected from the form.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub process: Process,
    pub drug_name: String,
    pub severity: Severity,
    pub details: String,
}

impl NewIncident {
    /// Per-field required checks, run before any write.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.drug_name.trim().is_empty() {
            errors.push(ValidationError::DrugNameBlank);
        }
        if self.details.trim().is_empty() {
            errors.push(ValidationError::DetailsBlank);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Builds the sheet row in exact [`schema::ALL`] order.
    ///
    /// Free-text fields are trimmed; `recorded_at` is supplied by the caller
    /// at append time and is not user-editable.
    pub fn to_row(&self, recorded_at: &str, unit_name: &str, reporter: &str) -> Vec<String> {
        vec![
            recorded_at.to_string(),
            unit_name.to_string(),
            reporter.to_string(),
            self.event_date.format("%Y-%m-%d").to_string(),
            self.event_time.format("%H:%M").to_string(),
            self.process.to_string(),
            self.drug_name.trim().to_string(),
            self.severity.to_string(),
            self.details.trim().to_string(),
        ]
    }
}
