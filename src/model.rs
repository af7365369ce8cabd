// model.rs
// Trade item records and buyer search criteria

use serde::{Deserialize, Serialize};

/// Capability advertised by the demo smartphone sellers.
pub const SMARTPHONE_MARKET: &str = "smartphone-market";

/// Categorical platform attribute of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Ios,
    Android,
    FreeOs,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::FreeOs => "free-os",
        }
    }
}

/// One record in a seller's catalog.
///
/// The `name` doubles as the catalog key (case-insensitive). Structured
/// attributes are optional; a record that omits one cannot satisfy a
/// criteria constraint on it. Price is a non-negative amount validated by
/// whatever collaborator constructs the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,

    /// Storage capacity, e.g. gigabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,

    /// Processor speed, e.g. GHz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    pub price: f64,
}

impl ItemRecord {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            capacity: None,
            speed: None,
            platform: None,
            price,
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }
}

/// Buyer-authored search criteria.
///
/// Every field is optional; an absent field places no constraint on the
/// matching attribute. Immutable once a negotiation session starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestCriteria {
    /// Case-insensitive substring of the item name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Minimum acceptable capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_capacity: Option<u32>,

    /// Minimum acceptable speed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_speed: Option<f64>,

    /// Exact platform required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Maximum budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

impl RequestCriteria {
    /// Criteria with no constraints at all; matches every record.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_min_capacity(mut self, capacity: u32) -> Self {
        self.min_capacity = Some(capacity);
        self
    }

    pub fn with_min_speed(mut self, speed: f64) -> Self {
        self.min_speed = Some(speed);
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_max_price(mut self, price: f64) -> Self {
        self.max_price = Some(price);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = ItemRecord::new("phoneX", 500.0)
            .with_capacity(128)
            .with_speed(2.4)
            .with_platform(Platform::Android);

        assert_eq!(record.name, "phoneX");
        assert_eq!(record.capacity, Some(128));
        assert_eq!(record.platform, Some(Platform::Android));
    }

    #[test]
    fn test_criteria_roundtrip() {
        let criteria = RequestCriteria::any()
            .with_name("phone")
            .with_max_price(600.0);

        let json = serde_json::to_string(&criteria).unwrap();
        let back: RequestCriteria = serde_json::from_str(&json).unwrap();
        assert_eq!(back, criteria);
        // unset fields stay off the wire
        assert!(!json.contains("min_capacity"));
    }
}
