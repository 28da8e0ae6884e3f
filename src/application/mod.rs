pub mod incident_log;
