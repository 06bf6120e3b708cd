use serde::{Deserialize, Serialize};

/// A class time with its remaining capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub time: String,
    #[serde(default)]
    pub available: u32,
    #[serde(default)]
    pub is_full: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDay {
    pub day_name: String,
    pub day_number: u32,
    pub month_name: String,
    #[serde(default)]
    pub morning: Vec<Slot>,
    #[serde(default)]
    pub afternoon: Vec<Slot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityExportRequest {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub availability: Vec<AvailabilityDay>,
    #[serde(default)]
    pub max_capacity: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLevel {
    Available,
    Urgent,
    Full,
}

impl SlotLevel {
    pub fn for_available(available: u32) -> Self {
        match available {
            0 => SlotLevel::Full,
            1 | 2 => SlotLevel::Urgent,
            _ => SlotLevel::Available,
        }
    }
}

impl Slot {
    pub fn level(&self) -> SlotLevel {
        SlotLevel::for_available(self.available)
    }

    pub fn label(&self) -> String {
        if self.is_full {
            format!("{} (Completo) ×", self.time)
        } else {
            format!("{} ({} disp)", self.time, self.available)
        }
    }
}

impl AvailabilityDay {
    /// "Lunes 3 Marzo", capitalising the weekday the way the grid shows it.
    pub fn header(&self) -> String {
        let mut chars = self.day_name.chars();
        let day = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        };
        format!("{day} {} {}", self.day_number, self.month_name)
    }

    /// Morning and afternoon slots paired by row index.
    pub fn rows(&self) -> impl Iterator<Item = (Option<&Slot>, Option<&Slot>)> {
        let count = self.morning.len().max(self.afternoon.len());
        (0..count).map(move |i| (self.morning.get(i), self.afternoon.get(i)))
    }
}
