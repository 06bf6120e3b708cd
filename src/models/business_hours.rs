use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub start_minutes: u32,
    pub end_minutes: u32,
}

impl Window {
    const fn hours(start: u32, end: u32) -> Self {
        Self {
            start_minutes: start * 60,
            end_minutes: end * 60,
        }
    }

    fn contains(&self, minutes: u32) -> bool {
        minutes >= self.start_minutes && minutes < self.end_minutes
    }
}

/// Studio opening hours: Monday to Saturday, two sessions a day, closed Sunday.
pub const MORNING: Window = Window::hours(6, 11);
pub const AFTERNOON: Window = Window::hours(17, 19);

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BusinessHoursStatus {
    pub open: bool,
    pub message: String,
}

pub fn status_at(local: &NaiveDateTime) -> BusinessHoursStatus {
    let weekday = local.weekday();
    let minutes = local.hour() * 60 + local.minute();

    if weekday == Weekday::Sun {
        return closed("Cerrado hoy (Domingo). Abrimos el Lunes a las 06:00 a.m.");
    }

    if MORNING.contains(minutes) {
        return BusinessHoursStatus {
            open: true,
            message: "Abierto ahora. Horario: 06:00 a.m. – 11:00 a.m. (Abrimos de nuevo 05:00 p.m.)"
                .to_string(),
        };
    }
    if AFTERNOON.contains(minutes) {
        return BusinessHoursStatus {
            open: true,
            message: "Abierto ahora. Horario: 05:00 p.m. – 07:00 p.m. (última clase)".to_string(),
        };
    }

    if minutes < MORNING.start_minutes {
        return closed("Cerrado. Abrimos hoy a las 06:00 a.m.");
    }
    if minutes < AFTERNOON.start_minutes {
        return closed("Cerrado (Hora de comida). Abrimos a las 05:00 p.m.");
    }

    let next = match weekday {
        Weekday::Sat => "el Lunes",
        Weekday::Fri => "mañana Sábado",
        _ => "mañana",
    };
    closed(&format!("Cerrado. Abrimos {next} a las 06:00 a.m."))
}

fn closed(message: &str) -> BusinessHoursStatus {
    BusinessHoursStatus {
        open: false,
        message: message.to_string(),
    }
}
