use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version tag leading every config token.
const TOKEN_VERSION: char = '1';
/// Separator between player tokens in a config blob.
pub const BLOB_SEPARATOR: char = '~';
const NAME_SEPARATOR: char = ':';
pub const MAX_PLAYER_NAME_LEN: usize = 16;
/// Crystals available in the standard layout.
pub const CRYSTAL_COUNT: u8 = 4;

/// Errors raised while encoding or parsing a transported config token or blob.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigParseError {
    #[error("config token is empty")]
    Empty,

    #[error("unsupported config token version '{0}'")]
    UnsupportedVersion(char),

    #[error("config token has {got} option digits, expected {expected}")]
    Length { expected: usize, got: usize },

    #[error("invalid value '{value}' for option {option}")]
    InvalidValue { option: &'static str, value: char },

    #[error("player name is not valid hex-encoded UTF-8")]
    InvalidName,

    #[error("option {option} value {value} does not fit in a token digit")]
    Unencodable { option: &'static str, value: u8 },

    #[error("player {slot}: {source}")]
    Slot {
        slot: usize,
        #[source]
        source: Box<ConfigParseError>,
    },
}

macro_rules! token_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($digit:literal, $text:literal)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            fn to_digit(self) -> char {
                match self {
                    $($name::$variant => $digit),+
                }
            }

            fn from_digit(c: char) -> Option<Self> {
                match c {
                    $($digit => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| format!("unknown {} '{}'", stringify!($name), s))
            }
        }
    };
}

token_enum!(
    /// Single player or several linked players sharing one item pool.
    GameMode { Normal => ('0', "normal"), Multiworld => ('1', "multiworld") }
);

token_enum!(
    /// Logic strictness; `Hard` assumes advanced techniques.
    LogicLevel { Normal => ('0', "normal"), Hard => ('1', "hard") }
);

token_enum!(
    ItemPlacement { Randomized => ('0', "randomized"), Early => ('1', "early") }
);

token_enum!(
    Goal { DefeatBoth => ('0', "defeatboth"), Crystals => ('1', "crystals") }
);

token_enum!(
    HeartColor { Red => ('0', "red"), Green => ('1', "green"), Blue => ('2', "blue"), Yellow => ('3', "yellow") }
);

token_enum!(
    BeepRate { Off => ('0', "off"), Quarter => ('1', "quarter"), Half => ('2', "half"), Normal => ('3', "normal") }
);

impl HeartColor {
    pub fn palette_byte(self) -> u8 {
        match self {
            HeartColor::Red => 0x24,
            HeartColor::Green => 0x3C,
            HeartColor::Blue => 0x2C,
            HeartColor::Yellow => 0x28,
        }
    }
}

impl BeepRate {
    pub fn frames(self) -> u8 {
        match self {
            BeepRate::Off => 0x00,
            BeepRate::Quarter => 0x80,
            BeepRate::Half => 0x40,
            BeepRate::Normal => 0x20,
        }
    }
}

/// One player's selected options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub mode: GameMode,
    pub kingdom_logic: LogicLevel,
    pub depths_logic: LogicLevel,
    pub sword_location: ItemPlacement,
    pub morph_location: ItemPlacement,
    pub goal: Goal,
    pub crystals_required: u8,
    pub player_name: String,
    pub heart_color: HeartColor,
    pub low_health_beep: BeepRate,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: GameMode::Normal,
            kingdom_logic: LogicLevel::Normal,
            depths_logic: LogicLevel::Normal,
            sword_location: ItemPlacement::Randomized,
            morph_location: ItemPlacement::Randomized,
            goal: Goal::DefeatBoth,
            crystals_required: CRYSTAL_COUNT,
            player_name: String::new(),
            heart_color: HeartColor::Red,
            low_health_beep: BeepRate::Normal,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OptionId {
    Mode,
    KingdomLogic,
    DepthsLogic,
    SwordLocation,
    MorphLocation,
    Goal,
    CrystalsRequired,
    PlayerName,
    HeartColor,
    LowHealthBeep,
}

/// Which game modes an option may be changed from its default in.
#[derive(Copy, Clone, Debug)]
pub struct OptionMeta {
    pub id: OptionId,
    pub key: &'static str,
    pub modes: &'static [GameMode],
}

const ALL_MODES: &[GameMode] = &[GameMode::Normal, GameMode::Multiworld];

pub const OPTION_TABLE: &[OptionMeta] = &[
    OptionMeta { id: OptionId::Mode, key: "mode", modes: ALL_MODES },
    OptionMeta { id: OptionId::KingdomLogic, key: "kingdom_logic", modes: ALL_MODES },
    OptionMeta { id: OptionId::DepthsLogic, key: "depths_logic", modes: ALL_MODES },
    OptionMeta { id: OptionId::SwordLocation, key: "sword_location", modes: ALL_MODES },
    OptionMeta { id: OptionId::MorphLocation, key: "morph_location", modes: ALL_MODES },
    OptionMeta { id: OptionId::Goal, key: "goal", modes: ALL_MODES },
    OptionMeta { id: OptionId::CrystalsRequired, key: "crystals_required", modes: ALL_MODES },
    OptionMeta { id: OptionId::PlayerName, key: "player_name", modes: &[GameMode::Multiworld] },
    OptionMeta { id: OptionId::HeartColor, key: "heart_color", modes: ALL_MODES },
    OptionMeta { id: OptionId::LowHealthBeep, key: "low_health_beep", modes: ALL_MODES },
];

impl Config {
    pub fn multiworld(player_name: &str) -> Self {
        Self {
            mode: GameMode::Multiworld,
            player_name: player_name.to_string(),
            ..Self::default()
        }
    }

    /// True when `id` holds something other than its default value.
    pub fn is_set(&self, id: OptionId) -> bool {
        let d = Config::default();
        match id {
            OptionId::Mode => self.mode != d.mode,
            OptionId::KingdomLogic => self.kingdom_logic != d.kingdom_logic,
            OptionId::DepthsLogic => self.depths_logic != d.depths_logic,
            OptionId::SwordLocation => self.sword_location != d.sword_location,
            OptionId::MorphLocation => self.morph_location != d.morph_location,
            OptionId::Goal => self.goal != d.goal,
            OptionId::CrystalsRequired => self.crystals_required != d.crystals_required,
            OptionId::PlayerName => !self.player_name.is_empty(),
            OptionId::HeartColor => self.heart_color != d.heart_color,
            OptionId::LowHealthBeep => self.low_health_beep != d.low_health_beep,
        }
    }

    /// Checks this config on its own. Cross-player checks live in the generator.
    pub fn validate(&self) -> Result<(), String> {
        for meta in OPTION_TABLE {
            if self.is_set(meta.id) && !meta.modes.contains(&self.mode) {
                return Err(format!(
                    "option {} is not available in {} mode",
                    meta.key, self.mode
                ));
            }
        }

        if self.crystals_required > CRYSTAL_COUNT {
            return Err(format!(
                "crystals_required is {} but only {} crystals exist",
                self.crystals_required, CRYSTAL_COUNT
            ));
        }

        if self.goal != Goal::Crystals && self.is_set(OptionId::CrystalsRequired) {
            return Err("crystals_required needs goal=crystals".to_string());
        }

        if self.mode == GameMode::Multiworld && self.player_name.trim().is_empty() {
            return Err("multiworld players need a player_name".to_string());
        }

        if self.player_name.len() > MAX_PLAYER_NAME_LEN {
            return Err(format!(
                "player_name is longer than {} bytes",
                MAX_PLAYER_NAME_LEN
            ));
        }

        Ok(())
    }

    /// Compact single-token form: version, one digit per option, then the
    /// hex-encoded player name.
    pub fn to_token(&self) -> Result<String, ConfigParseError> {
        if self.crystals_required > 9 {
            return Err(ConfigParseError::Unencodable {
                option: "crystals_required",
                value: self.crystals_required,
            });
        }
        let mut token = String::with_capacity(12 + self.player_name.len() * 2);
        token.push(TOKEN_VERSION);
        token.push(self.mode.to_digit());
        token.push(self.kingdom_logic.to_digit());
        token.push(self.depths_logic.to_digit());
        token.push(self.sword_location.to_digit());
        token.push(self.morph_location.to_digit());
        token.push(self.goal.to_digit());
        token.push(char::from(b'0' + self.crystals_required));
        token.push(self.heart_color.to_digit());
        token.push(self.low_health_beep.to_digit());
        if !self.player_name.is_empty() {
            token.push(NAME_SEPARATOR);
            for b in self.player_name.as_bytes() {
                token.push_str(&format!("{:02x}", b));
            }
        }
        Ok(token)
    }

    pub fn from_token(token: &str) -> Result<Config, ConfigParseError> {
        const DIGITS: usize = 9;

        let token = token.trim();
        let mut chars = token.chars();
        let version = chars.next().ok_or(ConfigParseError::Empty)?;
        if version != TOKEN_VERSION {
            return Err(ConfigParseError::UnsupportedVersion(version));
        }

        let rest = chars.as_str();
        let (digits, name_hex) = match rest.split_once(NAME_SEPARATOR) {
            Some((digits, name)) => (digits, Some(name)),
            None => (rest, None),
        };

        let d: Vec<char> = digits.chars().collect();
        if d.len() != DIGITS {
            return Err(ConfigParseError::Length {
                expected: DIGITS,
                got: d.len(),
            });
        }

        fn field<T>(
            c: char,
            option: &'static str,
            parse: fn(char) -> Option<T>,
        ) -> Result<T, ConfigParseError> {
            parse(c).ok_or(ConfigParseError::InvalidValue { option, value: c })
        }

        let crystals_required = d[6]
            .to_digit(10)
            .map(|v| v as u8)
            .ok_or(ConfigParseError::InvalidValue {
                option: "crystals_required",
                value: d[6],
            })?;

        let player_name = match name_hex {
            Some(hex) => decode_name(hex)?,
            None => String::new(),
        };

        Ok(Config {
            mode: field(d[0], "mode", GameMode::from_digit)?,
            kingdom_logic: field(d[1], "kingdom_logic", LogicLevel::from_digit)?,
            depths_logic: field(d[2], "depths_logic", LogicLevel::from_digit)?,
            sword_location: field(d[3], "sword_location", ItemPlacement::from_digit)?,
            morph_location: field(d[4], "morph_location", ItemPlacement::from_digit)?,
            goal: field(d[5], "goal", Goal::from_digit)?,
            crystals_required,
            player_name,
            heart_color: field(d[7], "heart_color", HeartColor::from_digit)?,
            low_health_beep: field(d[8], "low_health_beep", BeepRate::from_digit)?,
        })
    }
}

fn decode_name(hex: &str) -> Result<String, ConfigParseError> {
    if hex.is_empty() || hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(ConfigParseError::InvalidName);
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| ConfigParseError::InvalidName)?;
    String::from_utf8(bytes).map_err(|_| ConfigParseError::InvalidName)
}

/// Joins several players' tokens into one transportable blob.
pub fn encode_config_blob(configs: &[Config]) -> Result<String, ConfigParseError> {
    let tokens = configs
        .iter()
        .enumerate()
        .map(|(slot, config)| {
            config.to_token().map_err(|e| ConfigParseError::Slot {
                slot,
                source: Box::new(e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tokens.join(&BLOB_SEPARATOR.to_string()))
}

/// Parses every token of a blob independently, so one malformed player
/// does not hide the others.
pub fn parse_config_blob(blob: &str) -> Vec<Result<Config, ConfigParseError>> {
    blob.split(BLOB_SEPARATOR)
        .enumerate()
        .map(|(slot, token)| {
            Config::from_token(token).map_err(|e| ConfigParseError::Slot {
                slot,
                source: Box::new(e),
            })
        })
        .collect()
}

/// Like [`parse_config_blob`] but fails on the first malformed token.
pub fn parse_config_blob_strict(blob: &str) -> Result<Vec<Config>, ConfigParseError> {
    parse_config_blob(blob).into_iter().collect()
}
