//! Device status parsing.
//!
//! Turns the flat `(label, value, unit)` status sequence reported by a device
//! driver into structured per-component readouts.
//!
//! A component block is four consecutive lines:
//!
//! ```text
//! Fan 1           DC
//! Fan 1 current   0.05  A
//! Fan 1 speed     1020  rpm
//! Fan 1 voltage   11.91 V
//! ```

use std::collections::BTreeMap;

// =============================================================================
// Raw Status Lines
// =============================================================================

/// Driver text used for unpopulated slots.
const ABSENT_MARKER: &str = "\u{2014}";

/// Em-dash decoded as Windows-1252 instead of UTF-8.
const ABSENT_MARKER_MISDECODED: &str = "\u{e2}\u{20ac}\u{201d}";

/// Value column of a status line.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusValue {
    /// Free text, e.g. a fan control mode ("DC", "PWM") or a firmware version.
    Text(String),
    Integer(i64),
    Float(f64),
    /// The device reports nothing connected in this slot.
    Absent,
}

impl StatusValue {
    /// Convert driver text to a value, mapping the unpopulated-slot marker to
    /// [`StatusValue::Absent`].
    pub fn from_driver_text(text: &str) -> Self {
        match text.trim() {
            ABSENT_MARKER | ABSENT_MARKER_MISDECODED => StatusValue::Absent,
            other => StatusValue::Text(other.to_string()),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, StatusValue::Integer(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, StatusValue::Absent)
    }

    /// Numeric value as a float. Integers widen, non-finite floats are rejected.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatusValue::Integer(v) => Some(*v as f64),
            StatusValue::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as an integer. Floats truncate toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StatusValue::Integer(v) => Some(*v),
            StatusValue::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            _ => None,
        }
    }
}

impl From<i64> for StatusValue {
    fn from(v: i64) -> Self {
        StatusValue::Integer(v)
    }
}

impl From<f64> for StatusValue {
    fn from(v: f64) -> Self {
        StatusValue::Float(v)
    }
}

impl From<&str> for StatusValue {
    fn from(s: &str) -> Self {
        StatusValue::Text(s.to_string())
    }
}

impl std::fmt::Display for StatusValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusValue::Text(s) => write!(f, "{}", s),
            StatusValue::Integer(v) => write!(f, "{}", v),
            StatusValue::Float(v) => write!(f, "{}", v),
            StatusValue::Absent => write!(f, "{}", ABSENT_MARKER),
        }
    }
}

/// One `(label, value, unit)` entry of a device status report.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub label: String,
    pub value: StatusValue,
    pub unit: String,
}

impl StatusLine {
    pub fn new(label: &str, value: impl Into<StatusValue>, unit: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
            unit: unit.to_string(),
        }
    }
}

// =============================================================================
// Readouts
// =============================================================================

/// Units the device reported next to each sensor value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadoutUnits {
    pub current: String,
    pub speed: String,
    pub voltage: String,
}

impl ReadoutUnits {
    /// Units from a block's sensor lines; a blank unit keeps the usual one.
    fn from_lines(current: &StatusLine, speed: &StatusLine, voltage: &StatusLine) -> Self {
        let pick = |line: &StatusLine, fallback: &str| {
            let unit = line.unit.trim();
            let unit = if unit.is_empty() { fallback } else { unit };
            unit.to_string()
        };
        Self {
            current: pick(current, "A"),
            speed: pick(speed, "rpm"),
            voltage: pick(voltage, "V"),
        }
    }
}

impl Default for ReadoutUnits {
    fn default() -> Self {
        Self {
            current: "A".into(),
            speed: "rpm".into(),
            voltage: "V".into(),
        }
    }
}

/// Parsed snapshot of one component's sensors.
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    pub component_name: String,
    /// Control mode reported in the header line ("DC", "PWM", ...).
    pub mode: String,
    /// Current draw, usually amperes.
    pub current: f64,
    /// Speed, usually RPM.
    pub speed: i64,
    /// Voltage, usually volts.
    pub voltage: f64,
    pub units: ReadoutUnits,
}

impl Readout {
    /// Power draw in watts.
    pub fn power(&self) -> f64 {
        self.current * self.voltage
    }
}

impl std::fmt::Display for Readout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<8} {:<4} {:>6.2} {} {:>6} {} {:>6.2} {} {:>6.2} W",
            self.component_name,
            self.mode,
            self.current,
            self.units.current.to_uppercase(),
            self.speed,
            self.units.speed.to_uppercase(),
            self.voltage,
            self.units.voltage.to_uppercase(),
            self.power()
        )
    }
}

/// Readouts keyed by component name.
pub type Readouts = BTreeMap<String, Readout>;

// =============================================================================
// Parsing
// =============================================================================

/// Parse a raw status sequence into per-component readouts.
///
/// Headers whose value is [`StatusValue::Absent`] are skipped, as are blocks
/// cut short by the end of the sequence or carrying non-numeric sensor values.
/// Never fails: a bad block only drops that component.
pub fn parse_status(raw: &[StatusLine]) -> Readouts {
    let mut readouts = Readouts::new();
    let mut i = 0;

    while i < raw.len() {
        if !is_component_header(&raw[i]) {
            i += 1;
            continue;
        }

        match parse_block(&raw[i..]) {
            Some(readout) => {
                readouts.insert(readout.component_name.clone(), readout);
                i += 4;
            }
            None => i += 1,
        }
    }

    readouts
}

/// `"Fan 1"`, `"Pump 2"`: exactly one space followed by a slot index.
fn is_component_label(label: &str) -> bool {
    match label.split_once(' ') {
        Some((name, index)) => {
            !name.is_empty()
                && !index.is_empty()
                && index.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

fn is_component_header(line: &StatusLine) -> bool {
    is_component_label(&line.label) && !line.value.is_integer() && !line.value.is_absent()
}

fn parse_block(block: &[StatusLine]) -> Option<Readout> {
    let [header, current, speed, voltage, ..] = block else {
        return None;
    };

    Some(Readout {
        component_name: header.label.clone(),
        mode: header.value.to_string(),
        current: current.value.as_f64()?,
        speed: speed.value.as_i64()?,
        voltage: voltage.value.as_f64()?,
        units: ReadoutUnits::from_lines(current, speed, voltage),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fan_block(name: &str, speed: i64, voltage: f64) -> Vec<StatusLine> {
        vec![
            StatusLine::new(name, "DC", ""),
            StatusLine::new(&format!("{} current", name), 0.05, "A"),
            StatusLine::new(&format!("{} speed", name), speed, "rpm"),
            StatusLine::new(&format!("{} voltage", name), voltage, "V"),
        ]
    }

    #[test]
    fn test_parse_hub_status() {
        let mut raw = fan_block("Fan 1", 1020, 11.91);
        raw.extend(fan_block("Fan 2", 980, 4.38));
        raw.push(StatusLine::new("Fan 3", StatusValue::Absent, ""));
        raw.push(StatusLine::new("Firmware version", "1.0.4", ""));
        raw.push(StatusLine::new("Noise level", 106_i64, "dB"));

        let readouts = parse_status(&raw);
        assert_eq!(readouts.len(), 2);

        let fan1 = &readouts["Fan 1"];
        assert_eq!(fan1.mode, "DC");
        assert_eq!(fan1.current, 0.05);
        assert_eq!(fan1.speed, 1020);
        assert_eq!(fan1.voltage, 11.91);
        assert!((fan1.power() - 0.5955).abs() < 1e-9);

        assert_eq!(readouts["Fan 2"].speed, 980);
        assert!(!readouts.contains_key("Fan 3"));
    }

    #[test]
    fn test_one_present_one_absent() {
        let mut raw = fan_block("Fan 1", 700, 12.0);
        raw.push(StatusLine::new("Fan 2", StatusValue::Absent, ""));

        let readouts = parse_status(&raw);
        assert_eq!(readouts.keys().collect::<Vec<_>>(), vec!["Fan 1"]);
    }

    #[test]
    fn test_truncated_block_is_omitted() {
        let mut raw = fan_block("Fan 1", 700, 12.0);
        raw.extend(fan_block("Fan 2", 800, 12.0).into_iter().take(3));

        let readouts = parse_status(&raw);
        assert_eq!(readouts.len(), 1);
        assert!(readouts.contains_key("Fan 1"));
    }

    #[test]
    fn test_non_numeric_block_is_omitted() {
        let raw = vec![
            StatusLine::new("Fan 1", "PWM", ""),
            StatusLine::new("Fan 1 current", "n/a", "A"),
            StatusLine::new("Fan 1 speed", 900_i64, "rpm"),
            StatusLine::new("Fan 1 voltage", 12.0, "V"),
        ];
        assert!(parse_status(&raw).is_empty());
    }

    #[test]
    fn test_header_rules() {
        // Integer value: a measurement, not a header.
        assert!(!is_component_header(&StatusLine::new("Fan 1", 1200_i64, "rpm")));
        // Two spaces.
        assert!(!is_component_header(&StatusLine::new("Fan 1 speed", "x", "")));
        // Second word is not a slot index.
        assert!(!is_component_header(&StatusLine::new("Firmware version", "1.0.4", "")));
        assert!(!is_component_header(&StatusLine::new("Pump 1", StatusValue::Absent, "")));
        assert!(is_component_header(&StatusLine::new("Pump 1", "PWM", "")));
        assert!(is_component_header(&StatusLine::new("Fan 12", 3.5, "")));
    }

    #[test]
    fn test_garbage_never_panics() {
        let raw = vec![
            StatusLine::new("", "", ""),
            StatusLine::new(" ", StatusValue::Absent, ""),
            StatusLine::new("Fan 1", "DC", ""),
            StatusLine::new("Fan 1 current", f64::NAN, "A"),
            StatusLine::new("Fan 2", "DC", ""),
        ];
        assert!(parse_status(&raw).is_empty());
        assert!(parse_status(&[]).is_empty());
    }

    #[test]
    fn test_float_speed_truncates() {
        let raw = vec![
            StatusLine::new("Fan 1", "DC", ""),
            StatusLine::new("Fan 1 current", 1_i64, "A"),
            StatusLine::new("Fan 1 speed", 1499.9, "rpm"),
            StatusLine::new("Fan 1 voltage", 12_i64, "V"),
        ];
        let readouts = parse_status(&raw);
        assert_eq!(readouts["Fan 1"].speed, 1499);
        assert_eq!(readouts["Fan 1"].current, 1.0);
    }

    #[test]
    fn test_driver_text_markers() {
        assert_eq!(StatusValue::from_driver_text("\u{2014}"), StatusValue::Absent);
        assert_eq!(
            StatusValue::from_driver_text("\u{e2}\u{20ac}\u{201d}"),
            StatusValue::Absent
        );
        assert_eq!(
            StatusValue::from_driver_text("DC"),
            StatusValue::Text("DC".into())
        );
    }

    #[test]
    fn test_readout_display_rounds() {
        let readout = Readout {
            component_name: "Fan 1".into(),
            mode: "DC".into(),
            current: 0.05123,
            speed: 1020,
            voltage: 11.916,
            units: ReadoutUnits::default(),
        };
        let text = readout.to_string();
        assert!(text.contains("0.05 A"));
        assert!(text.contains("1020 RPM"));
        assert!(text.contains("11.92 V"));
    }

    #[test]
    fn test_reported_units_are_kept() {
        let raw = vec![
            StatusLine::new("Pump 1", "PWM", ""),
            StatusLine::new("Pump 1 current", 210_i64, "mA"),
            StatusLine::new("Pump 1 speed", 2400_i64, "rpm"),
            StatusLine::new("Pump 1 voltage", 12.0, ""),
        ];
        let readout = &parse_status(&raw)["Pump 1"];
        assert_eq!(readout.units.current, "mA");
        assert_eq!(readout.units.voltage, "V");

        let text = readout.to_string();
        assert!(text.contains("210.00 MA"));
        assert!(text.contains("2400 RPM"));
        assert!(text.contains("12.00 V"));
    }
}
