//! Domain models exchanged with the Sealen API.
//!
//! Field names follow the API's JSON. Where the API is looser than the
//! domain (nullable references, free-form timestamps), the model decodes
//! through a private wire struct and rejects what the domain forbids.

pub mod booking;
pub mod certification;
pub mod dashboard;
pub mod product;
pub mod robot;
pub mod user;

pub use booking::{Booking, BookingDecodeError, BookingRequest, BookingTarget, Payment};
pub use certification::{
    Certificate, CertificationLevel, CertificationModule, CertificationProgress, ModuleProgress,
    ModuleProgressUpdate,
};
pub use dashboard::{ActivityEntry, DashboardOverview};
pub use product::Product;
pub use robot::{BatteryBand, Position, Robot, RobotTelemetry, SensorReadings};
pub use user::User;

/// Lenient timestamp decoding.
///
/// The API emits ISO-8601 timestamps both with an offset (`...Z`) and
/// without one (naive, implicitly UTC). Both decode to `DateTime<Utc>`;
/// encoding always writes RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Parse an API timestamp.
    ///
    /// # Errors
    ///
    /// Returns the naive-parse error if the input matches neither form.
    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        if let Ok(aware) = DateTime::parse_from_rfc3339(s) {
            return Ok(aware.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Same as the parent module, for nullable fields.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)] // serde's `with` hands us `&Option<T>`
        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(ts) => s.serialize_some(&ts.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }

}
