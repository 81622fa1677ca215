//! Temperature sensor reader
//!
//! Probes the sensor catalog, decodes `sp78` readings and keeps a per-sensor
//! validity flag up to date.

use smcfan_core::codec::decode_temperature;
use smcfan_core::{Result, SensorCatalog, SensorRecord, SmcError, SmcKey};
use tracing::{debug, info, warn};

use crate::smc_driver::SmcTransport;

/// Default sanity floor in decidegrees (-100.0°C)
pub const DEFAULT_SANITY_FLOOR: i16 = -1000;

pub struct SensorReader<T: SmcTransport> {
    transport: T,
    catalog: SensorCatalog,
    sanity_floor: i16,
}

impl<T: SmcTransport> SensorReader<T> {
    pub fn new(transport: T, catalog: SensorCatalog) -> Self {
        Self {
            transport,
            catalog,
            sanity_floor: DEFAULT_SANITY_FLOOR,
        }
    }

    /// Readings at or below `floor` are rejected during discovery
    pub fn with_sanity_floor(mut self, floor: i16) -> Self {
        self.sanity_floor = floor;
        self
    }

    pub fn catalog(&self) -> &SensorCatalog {
        &self.catalog
    }

    /// Catalog label for `key`, or the key itself
    pub fn describe(&self, key: &SmcKey) -> String {
        self.catalog.describe(key)
    }

    /// Read one temperature in decidegrees
    pub fn read_sensor(&mut self, key: SmcKey) -> Result<i16> {
        let data = self.transport.read_key(key)?;
        if data.len() < 2 {
            return Err(SmcError::device(format!(
                "{} returned {} byte(s), expected 2",
                key,
                data.len()
            )));
        }
        Ok(decode_temperature([data[0], data[1]]))
    }

    /// Probe the catalog in order and keep every sensor with a plausible
    /// reading
    pub fn discover_sensors(&mut self) -> Result<Vec<SensorRecord>> {
        let entries = self.catalog.entries().to_vec();
        let mut found = Vec::new();

        for entry in entries {
            match self.read_sensor(entry.key) {
                Ok(temperature) if temperature > self.sanity_floor => {
                    debug!("Sensor {} ({}): {}", entry.key, entry.label, temperature);
                    found.push(SensorRecord {
                        index: found.len(),
                        key: entry.key,
                        label: entry.label,
                        temperature,
                        valid: true,
                    });
                }
                Ok(temperature) => {
                    debug!(
                        "Sensor {} rejected: {} below sanity floor {}",
                        entry.key, temperature, self.sanity_floor
                    );
                }
                Err(e) => debug!("Sensor {} not present: {}", entry.key, e),
            }
        }

        if found.is_empty() {
            return Err(SmcError::NotFound("no temperature sensors responded".to_string()));
        }

        info!(
            "Discovered {} of {} catalog sensor(s)",
            found.len(),
            self.catalog.len()
        );
        Ok(found)
    }

    /// Re-read every record in place
    ///
    /// A failed read marks only that record invalid; the batch never fails.
    pub fn refresh_sensors(&mut self, records: &mut [SensorRecord]) {
        for record in records.iter_mut() {
            match self.read_sensor(record.key) {
                Ok(temperature) => {
                    record.temperature = temperature;
                    record.valid = true;
                }
                Err(e) => {
                    warn!("Sensor {} read failed: {}", record.key, e);
                    record.valid = false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockSmc;
    use smcfan_core::CatalogEntry;

    fn key(text: &str) -> SmcKey {
        SmcKey::new(text).unwrap()
    }

    fn catalog() -> SensorCatalog {
        SensorCatalog::from_entries(vec![
            CatalogEntry::new("TA0P", "Ambient Front").unwrap(),
            CatalogEntry::new("TC0P", "CPU Package").unwrap(),
            CatalogEntry::new("TH1P", "Drive Bay 0").unwrap(),
            CatalogEntry::new("TG0D", "GPU 0 Diode").unwrap(),
        ])
    }

    #[test]
    fn test_read_sensor() {
        let mock = MockSmc::new();
        mock.set(key("TC0P"), &[0x2D, 0x00]);
        let mut reader = SensorReader::new(mock, catalog());

        assert_eq!(reader.read_sensor(key("TC0P")).unwrap(), 450);
    }

    #[test]
    fn test_read_sensor_short_response() {
        let mock = MockSmc::new();
        mock.set(key("TC0P"), &[0x2D]);
        let mut reader = SensorReader::new(mock, catalog());

        assert!(matches!(
            reader.read_sensor(key("TC0P")),
            Err(SmcError::DeviceError { .. })
        ));
    }

    #[test]
    fn test_discover_in_catalog_order() {
        let mock = MockSmc::new();
        mock.set(key("TG0D"), &[0x34, 0x00]);
        mock.set(key("TA0P"), &[0x16, 0x80]);
        // Disconnected probe: -128°C
        mock.set(key("TH1P"), &[0x80, 0x00]);
        let mut reader = SensorReader::new(mock, catalog());

        let sensors = reader.discover_sensors().unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].index, 0);
        assert_eq!(sensors[0].key, key("TA0P"));
        assert_eq!(sensors[0].label, "Ambient Front");
        assert_eq!(sensors[0].temperature, 225);
        assert_eq!(sensors[1].index, 1);
        assert_eq!(sensors[1].key, key("TG0D"));
        assert!(sensors.iter().all(|s| s.valid));
    }

    #[test]
    fn test_discover_configurable_floor() {
        let mock = MockSmc::new();
        mock.set(key("TA0P"), &[0xFB, 0x00]); // -5.0°C
        let mut reader = SensorReader::new(mock, catalog()).with_sanity_floor(0);

        assert!(matches!(
            reader.discover_sensors(),
            Err(SmcError::NotFound(_))
        ));
    }

    #[test]
    fn test_discover_nothing_responds() {
        let mut reader = SensorReader::new(MockSmc::new(), catalog());
        assert!(matches!(
            reader.discover_sensors(),
            Err(SmcError::NotFound(_))
        ));
    }

    #[test]
    fn test_refresh_marks_validity_per_sensor() {
        let mock = MockSmc::new();
        mock.set(key("TA0P"), &[0x16, 0x80]);
        mock.set(key("TC0P"), &[0x2D, 0x00]);
        let mut reader = SensorReader::new(mock.clone(), catalog());
        let mut sensors = reader.discover_sensors().unwrap();

        mock.fail(key("TA0P"), SmcError::device("probe fault"));
        mock.set(key("TC0P"), &[0x2E, 0x00]);
        reader.refresh_sensors(&mut sensors);

        assert!(!sensors[0].valid);
        assert_eq!(sensors[0].temperature, 225);
        assert!(sensors[1].valid);
        assert_eq!(sensors[1].temperature, 460);

        mock.heal(key("TA0P"));
        reader.refresh_sensors(&mut sensors);
        assert!(sensors[0].valid);
    }

    #[test]
    fn test_describe() {
        let reader = SensorReader::new(MockSmc::new(), catalog());
        assert_eq!(reader.describe(&key("TC0P")), "CPU Package");
        assert_eq!(reader.describe(&key("XXXX")), "XXXX");
    }
}
