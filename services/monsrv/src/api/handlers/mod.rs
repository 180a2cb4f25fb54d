pub mod alarms;
pub mod health;
pub mod tags;
