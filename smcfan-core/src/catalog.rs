//! Temperature sensor catalog
//!
//! An ordered list of `(key, label)` pairs probed during sensor discovery. The
//! built-in table covers the Intel Mac sensor keys; configuration can append
//! machine-specific entries.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::key::SmcKey;

/// One catalog row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub key: SmcKey,
    pub label: String,
}

impl CatalogEntry {
    pub fn new(key: &str, label: impl Into<String>) -> Result<Self> {
        Ok(Self {
            key: SmcKey::new(key)?,
            label: label.into(),
        })
    }
}

/// Immutable, ordered sensor catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorCatalog {
    entries: Vec<CatalogEntry>,
}

const BUILTIN_SENSORS: &[(&str, &str)] = &[
    ("TA0P", "Ambient Front"),
    ("TA1P", "Ambient Rear"),
    ("TA2P", "Ambient Internal"),
    ("TA0S", "Ambient Sensor"),
    ("TA0D", "Ambient Diode"),
    ("TA0E", "Ambient Enclosure"),
    ("TA0T", "Ambient Top"),
    ("Tals", "Ambient Left Side"),
    ("Tars", "Ambient Right Side"),
    ("Tarl", "Ambient Rear Left"),
    ("TC0C", "CPU Core 0"),
    ("TC1C", "CPU Core 1"),
    ("TC2C", "CPU Core 2"),
    ("TC3C", "CPU Core 3"),
    ("TC4C", "CPU Core 4"),
    ("TC5C", "CPU Core 5"),
    ("TC6C", "CPU Core 6"),
    ("TC7C", "CPU Core 7"),
    ("TC8C", "CPU Core 8"),
    ("TC9C", "CPU Core 9"),
    ("TC0D", "CPU Diode"),
    ("TC1D", "CPU Diode 2"),
    ("TC0E", "CPU Heatsink"),
    ("TC0F", "CPU Proximity"),
    ("TC0H", "CPU Hot Spot"),
    ("TC0P", "CPU Package"),
    ("TC0G", "CPU Integrated GPU"),
    ("TCAC", "CPU A Core (PECI)"),
    ("TCAD", "CPU A Diode"),
    ("TCAG", "CPU A GPU"),
    ("TCAH", "CPU A Heatsink"),
    ("TCAS", "CPU A SRAM"),
    ("TCBC", "CPU B Core (PECI)"),
    ("TCBD", "CPU B Diode"),
    ("TCBG", "CPU B GPU"),
    ("TCBH", "CPU B Heatsink"),
    ("TCBS", "CPU B SRAM"),
    ("TCGC", "CPU Graphics Cluster"),
    ("TCGc", "CPU Graphics Cluster 2"),
    ("TCSC", "CPU System Cluster"),
    ("TCCD", "CPU Cross-Domain"),
    ("TG0D", "GPU 0 Diode"),
    ("TG1D", "GPU 1 Diode"),
    ("TG0P", "GPU 0 Proximity"),
    ("TG1P", "GPU 1 Proximity"),
    ("TG0C", "GPU 0 Core"),
    ("TG1C", "GPU 1 Core"),
    ("TG0S", "GPU 0 Sensor"),
    ("TG1S", "GPU 1 Sensor"),
    ("TG0T", "GPU 0 Die"),
    ("TG1T", "GPU 1 Die"),
    ("TG0G", "GPU 0 Graphics"),
    ("TG0H", "GPU Heatsink"),
    ("TGDD", "GPU Desktop Discrete"),
    ("TeGG", "GPU Graphics Thermal Group"),
    ("TeRG", "GPU RAM Thermal Group"),
    ("TeGP", "GPU Package"),
    ("TeRP", "GPU RAM Package"),
    ("Tm0P", "Memory Bank 0 Proximity"),
    ("Tm1P", "Memory Bank 1 Proximity"),
    ("Tm2P", "Memory Bank 2 Proximity"),
    ("Tm3P", "Memory Bank 3 Proximity"),
    ("Tm4P", "Memory Bank 4 Proximity"),
    ("Tm5P", "Memory Bank 5 Proximity"),
    ("Tm6P", "Memory Bank 6 Proximity"),
    ("Tm7P", "Memory Bank 7 Proximity"),
    ("TmAS", "Memory Slot A"),
    ("TmBS", "Memory Slot B"),
    ("TmCS", "Memory Slot C"),
    ("TmDS", "Memory Slot D"),
    ("TM0P", "Memory Proximity"),
    ("TM1P", "DIMM Proximity 1"),
    ("TM2P", "DIMM Proximity 2"),
    ("TM3P", "DIMM Proximity 3"),
    ("TM4P", "DIMM Proximity 4"),
    ("TM5P", "DIMM Proximity 5"),
    ("TM6P", "DIMM Proximity 6"),
    ("TM7P", "DIMM Proximity 7"),
    ("TM8P", "DIMM Proximity 8"),
    ("TM0S", "Memory Slot 0"),
    ("TM1S", "Memory Slot 1"),
    ("TM8S", "Memory Slot 2"),
    ("TM9S", "Memory Slot 3"),
    ("TMA1", "Memory Bank A1"),
    ("TMA2", "Memory Bank A2"),
    ("TMA3", "Memory Bank A3"),
    ("TMA4", "Memory Bank A4"),
    ("TMB1", "Memory Bank B1"),
    ("TMB2", "Memory Bank B2"),
    ("TMB3", "Memory Bank B3"),
    ("TMB4", "Memory Bank B4"),
    ("TMHS", "Memory Heatsink"),
    ("TMLS", "Memory Low Side"),
    ("TMPS", "Memory Power Supply"),
    ("TMPV", "Memory PVDD"),
    ("TMTG", "Memory Thermal Group"),
    ("TH1P", "Drive Bay 0"),
    ("TH2P", "Drive Bay 1"),
    ("TH3P", "Drive Bay 2"),
    ("TH4P", "Drive Bay 3"),
    ("HDD0", "Drive Bay 0 Temp"),
    ("HDD1", "Drive Bay 1 Temp"),
    ("HDD2", "Drive Bay 2 Temp"),
    ("HDD3", "Drive Bay 3 Temp"),
    ("TH1F", "Drive Bay 1 Front"),
    ("TH1V", "Drive Bay 1 SATA"),
    ("TH2F", "Drive Bay 2 Front"),
    ("TH2V", "Drive Bay 2 SATA"),
    ("TH3F", "Drive Bay 3 Front"),
    ("TH3V", "Drive Bay 3 SATA"),
    ("TH4F", "Drive Bay 4 Front"),
    ("TH4V", "Drive Bay 4 SATA"),
    ("TH0P", "HDD Proximity"),
    ("Th0H", "Drive Thermal"),
    ("Th1H", "Heatpipe 1"),
    ("Th2H", "Heatpipe 2"),
    ("THPS", "HDD Power Supply"),
    ("Te1P", "PCIe Ambient"),
    ("Te1F", "PCIe Slot 1 Front"),
    ("Te1S", "PCIe Slot 1 Side"),
    ("Te2F", "PCIe Slot 2 Front"),
    ("Te2S", "PCIe Slot 2 Side"),
    ("Te3F", "PCIe Slot 3 Front"),
    ("Te3S", "PCIe Slot 3 Side"),
    ("Te4F", "PCIe Slot 4 Front"),
    ("Te4S", "PCIe Slot 4 Side"),
    ("Te5F", "PCIe Slot 5 Front"),
    ("Te5S", "PCIe Slot 5 Side"),
    ("TN0D", "Northbridge Diode"),
    ("TN0H", "Northbridge Heatsink"),
    ("TN0P", "Northbridge Proximity"),
    ("TN0S", "Northbridge Sensor"),
    ("TN1P", "Northbridge 2"),
    ("TNTG", "Northbridge Thermal Group"),
    ("TPCD", "PCH Die"),
    ("TB0T", "Battery 0"),
    ("TB1T", "Battery 1"),
    ("TB2T", "Battery 2"),
    ("TB3T", "Battery 3"),
    ("TB0S", "Battery Sensor 0"),
    ("TB1S", "Battery Sensor 1"),
    ("TB1F", "Battery Front"),
    ("TB1M", "Battery Middle"),
    ("TB1r", "Battery Rear"),
    ("TL0P", "LCD Proximity"),
    ("TL1P", "LCD Proximity 2"),
    ("TO0P", "Optical Drive"),
    ("Tp0C", "Power Supply"),
    ("Tp0P", "Power Supply Proximity"),
    ("Tp0D", "Power Supply Diode"),
    ("Tp1C", "Power Supply 2"),
    ("Tp1P", "Power Supply Proximity 2"),
    ("TpPS", "Power Supply Sensor"),
    ("TpTG", "Power Supply Thermal Group"),
    ("TV0R", "Voltage Regulator"),
    ("THTG", "Thermal Group Target"),
    ("TW0P", "Wireless Module"),
    ("TW0S", "Wireless Sensor"),
    ("TWAP", "Wireless Alt"),
    ("Ts0P", "Palm Rest Left"),
    ("Ts1P", "Palm Rest Right"),
    ("Ts0S", "Trackpad Sensor 0"),
    ("Ts1S", "Trackpad Sensor 1"),
    ("Te0T", "Enclosure Top"),
    ("Te1T", "Enclosure Bottom 1"),
    ("Te2T", "Enclosure Bottom 2"),
    ("Te3T", "Enclosure Bottom 3"),
    ("TD0P", "Thermal Diode 0"),
    ("TD1P", "Thermal Diode 1"),
    ("TD2P", "Thermal Diode 2"),
    ("TD3P", "Thermal Diode 3"),
];

impl SensorCatalog {
    /// The built-in Intel Mac table
    pub fn builtin() -> Self {
        let entries = BUILTIN_SENSORS
            .iter()
            .filter_map(|(key, label)| CatalogEntry::new(key, *label).ok())
            .collect();
        Self { entries }
    }

    /// Build a catalog from explicit entries, in order
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Append entries whose key is not already present
    pub fn extend(mut self, extra: impl IntoIterator<Item = CatalogEntry>) -> Self {
        for entry in extra {
            if !self.contains(&entry.key) {
                self.entries.push(entry);
            }
        }
        self
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &SmcKey) -> bool {
        self.entries.iter().any(|e| &e.key == key)
    }

    /// Catalog label of `key`, if any
    pub fn label(&self, key: &SmcKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| &e.key == key)
            .map(|e| e.label.as_str())
    }

    /// Catalog label of `key`, or the key text itself
    pub fn describe(&self, key: &SmcKey) -> String {
        self.label(key)
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }
}
