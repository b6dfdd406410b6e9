// Server profile data model
// A profile is immutable once stored. Changing one means delete + add.

use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PORT;
use crate::error::{ProfileError, Result};

/// Anything that can be shown as a single row in a list.
pub trait SectionTitle {
    fn section_title(&self) -> &str;
}

/// Connection parameters for one MPD server plus streaming and cover settings.
///
/// `creation_date` (milliseconds since the epoch) is the identity of the
/// profile and the primary key of its row. It is fixed at construction.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    name: String,
    auto_connect: bool,
    hostname: String,
    password: String,
    port: u16,
    streaming_enabled: bool,
    streaming_url: String,
    http_cover_enabled: bool,
    http_cover_regex: String,
    creation_date: i64,
}

impl ProfileRecord {
    /// Fresh profile stamped with the current time.
    pub fn new(name: impl Into<String>, auto_connect: bool) -> Self {
        Self::with_creation_date(name, auto_connect, chrono::Utc::now().timestamp_millis())
    }

    pub fn with_creation_date(name: impl Into<String>, auto_connect: bool, creation_date: i64) -> Self {
        Self {
            name: name.into(),
            auto_connect,
            hostname: String::new(),
            password: String::new(),
            port: DEFAULT_PORT,
            streaming_enabled: false,
            streaming_url: String::new(),
            http_cover_enabled: false,
            http_cover_regex: String::new(),
            creation_date,
        }
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// The store keeps the URL in an integer-typed column, so a purely numeric
    /// URL such as `"007"` or `"8000.0"` reads back in SQLite's canonical form.
    pub fn with_streaming(mut self, enabled: bool, url: impl Into<String>) -> Self {
        self.streaming_enabled = enabled;
        self.streaming_url = url.into();
        self
    }

    pub fn with_http_cover(mut self, enabled: bool, regex: impl Into<String>) -> Self {
        self.http_cover_enabled = enabled;
        self.http_cover_regex = regex.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn auto_connect(&self) -> bool {
        self.auto_connect
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn streaming_enabled(&self) -> bool {
        self.streaming_enabled
    }

    pub fn streaming_url(&self) -> &str {
        &self.streaming_url
    }

    pub fn http_cover_enabled(&self) -> bool {
        self.http_cover_enabled
    }

    pub fn http_cover_regex(&self) -> &str {
        &self.http_cover_regex
    }

    pub fn creation_date(&self) -> i64 {
        self.creation_date
    }

    /// Full rendering of every field, password included.
    /// Do not write this to shared or persistent logs.
    pub fn details(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Profilename: {}\n", self.name));
        out.push_str(&format!("Profile autoconnect: {}\n", self.auto_connect));
        out.push_str(&format!("Hostname: {}\n", self.hostname));
        out.push_str(&format!("Password: {}\n", self.password));
        out.push_str(&format!("Port: {}\n", self.port));
        out.push_str(&format!("Streaming enabled: {}\n", self.streaming_enabled));
        out.push_str(&format!("Streaming URL: {}\n", self.streaming_url));
        out.push_str(&format!("HTTP cover enabled: {}\n", self.http_cover_enabled));
        out.push_str(&format!("HTTP cover regex: {}\n", self.http_cover_regex));
        out.push_str(&format!("Created: {}\n", self.creation_date));
        out
    }

    /// Whether covers should be fetched over HTTP for this server.
    pub fn http_cover_active(&self) -> bool {
        self.http_cover_enabled && !self.http_cover_regex.is_empty()
    }

    /// Expand the HTTP cover template for a track.
    ///
    /// `%f` becomes the track path and `%d` the directory containing it
    /// (with trailing slash). Both are percent-encoded, slashes excepted.
    pub fn resolve_cover_url(&self, track_path: &str) -> String {
        let directory = match track_path.rfind('/') {
            Some(idx) => &track_path[..=idx],
            None => "",
        };
        let file = encode_url_unsafe(track_path);
        let directory = encode_url_unsafe(directory);

        placeholder_pattern()
            .replace_all(&self.http_cover_regex, |caps: &Captures| {
                if &caps[0] == "%f" {
                    file.clone()
                } else {
                    directory.clone()
                }
            })
            .into_owned()
    }

    // ----- Binary transport -----
    // Field order is fixed: name, auto_connect, hostname, password, port,
    // streaming_url, streaming_enabled, http_cover_regex, http_cover_enabled,
    // creation_date. Strings are u32 LE length + UTF-8, bools one byte.

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            32 + self.name.len()
                + self.hostname.len()
                + self.password.len()
                + self.streaming_url.len()
                + self.http_cover_regex.len(),
        );
        write_str(&mut out, &self.name);
        out.push(self.auto_connect as u8);
        write_str(&mut out, &self.hostname);
        write_str(&mut out, &self.password);
        out.extend_from_slice(&self.port.to_le_bytes());
        write_str(&mut out, &self.streaming_url);
        out.push(self.streaming_enabled as u8);
        write_str(&mut out, &self.http_cover_regex);
        out.push(self.http_cover_enabled as u8);
        out.extend_from_slice(&self.creation_date.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { buf: bytes, pos: 0 };

        let name = reader.read_str("name")?;
        let auto_connect = reader.read_bool("auto_connect")?;
        let hostname = reader.read_str("hostname")?;
        let password = reader.read_str("password")?;
        let port = u16::from_le_bytes(reader.take_array("port")?);
        let streaming_url = reader.read_str("streaming_url")?;
        let streaming_enabled = reader.read_bool("streaming_enabled")?;
        let http_cover_regex = reader.read_str("http_cover_regex")?;
        let http_cover_enabled = reader.read_bool("http_cover_enabled")?;
        let creation_date = i64::from_le_bytes(reader.take_array("creation_date")?);
        reader.finish()?;

        Ok(Self {
            name,
            auto_connect,
            hostname,
            password,
            port,
            streaming_enabled,
            streaming_url,
            http_cover_enabled,
            http_cover_regex,
            creation_date,
        })
    }
}

impl SectionTitle for ProfileRecord {
    fn section_title(&self) -> &str {
        &self.name
    }
}

// Password is redacted so profiles can be logged with {:?}.
impl fmt::Debug for ProfileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileRecord")
            .field("name", &self.name)
            .field("auto_connect", &self.auto_connect)
            .field("hostname", &self.hostname)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .field("port", &self.port)
            .field("streaming_enabled", &self.streaming_enabled)
            .field("streaming_url", &self.streaming_url)
            .field("http_cover_enabled", &self.http_cover_enabled)
            .field("http_cover_regex", &self.http_cover_regex)
            .field("creation_date", &self.creation_date)
            .finish()
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("%[fd]").expect("placeholder pattern is valid"))
}

fn encode_url_unsafe(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn write_str(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| ProfileError::Decode(format!("truncated while reading {}", field)))?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self, field: &str) -> Result<[u8; N]> {
        let bytes = self.take(N, field)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    fn read_str(&mut self, field: &str) -> Result<String> {
        let len = u32::from_le_bytes(self.take_array(field)?) as usize;
        let bytes = self.take(len, field)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ProfileError::Decode(format!("{} is not valid UTF-8: {}", field, e)))
    }

    fn read_bool(&mut self, field: &str) -> Result<bool> {
        match self.take(1, field)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProfileError::Decode(format!("invalid bool {} for {}", other, field))),
        }
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(ProfileError::Decode(format!(
                "{} trailing bytes",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}
