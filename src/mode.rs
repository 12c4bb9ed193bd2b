use std::fmt;

use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum MemMode {
    #[serde(rename = "ROM")]
    Rom,
    SinglePort,
    SimpleDualPort,
    TrueDualPort,
}

impl MemMode {
    pub const ALL: [MemMode; 4] = [
        MemMode::Rom,
        MemMode::SinglePort,
        MemMode::SimpleDualPort,
        MemMode::TrueDualPort,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ROM" => Some(MemMode::Rom),
            "SinglePort" => Some(MemMode::SinglePort),
            "SimpleDualPort" => Some(MemMode::SimpleDualPort),
            "TrueDualPort" => Some(MemMode::TrueDualPort),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemMode::Rom => "ROM",
            MemMode::SinglePort => "SinglePort",
            MemMode::SimpleDualPort => "SimpleDualPort",
            MemMode::TrueDualPort => "TrueDualPort",
        }
    }

    pub fn is_true_dual_port(&self) -> bool {
        *self == MemMode::TrueDualPort
    }
}

impl fmt::Display for MemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for mode in MemMode::ALL {
            assert_eq!(MemMode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(MemMode::from_str("DualPort"), None);
    }

    #[test]
    fn deserializes_manifest_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            modes: Vec<MemMode>,
        }
        let w: Wrapper = toml::from_str(r#"modes = ["ROM", "TrueDualPort"]"#).unwrap();
        assert_eq!(w.modes, vec![MemMode::Rom, MemMode::TrueDualPort]);
    }
}
