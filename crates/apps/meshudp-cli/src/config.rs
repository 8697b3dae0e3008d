use std::fs;
use std::path::Path;

use serde::Deserialize;

/// TOML config file: node identity plus the channel list. The first
/// channel is the one packets are sent on; the rest only contribute
/// receive keys.
///
/// ```toml
/// [node]
/// id = "!deadbeef"
/// long_name = "UDP Test"
/// short_name = "UDP"
///
/// [[channels]]
/// name = "LongFast"
/// key = "AQ=="
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub channels: Vec<ChannelSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeSection {
    pub id: Option<String>,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelSection {
    pub name: String,
    #[serde(default)]
    pub key: String,
}

impl FileConfig {
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[node]
id = "!deadbeef"
long_name = "UDP Test"
short_name = "UDP"

[[channels]]
name = "LongFast"
key = "AQ=="

[[channels]]
name = "MediumFast"
"#;

    #[test]
    fn parses_node_and_channels() {
        let config = FileConfig::from_toml(SAMPLE).expect("parse");
        assert_eq!(config.node.id.as_deref(), Some("!deadbeef"));
        assert_eq!(config.node.long_name.as_deref(), Some("UDP Test"));
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[0].name, "LongFast");
        assert_eq!(config.channels[0].key, "AQ==");
        // Missing key means a plaintext channel.
        assert_eq!(config.channels[1].key, "");
    }

    #[test]
    fn empty_file_is_a_valid_config() {
        let config = FileConfig::from_toml("").expect("parse");
        assert!(config.node.id.is_none());
        assert!(config.channels.is_empty());
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(SAMPLE.as_bytes()).expect("write");
        let config = FileConfig::from_path(file.path()).expect("load");
        assert_eq!(config.node.short_name.as_deref(), Some("UDP"));
    }
}
