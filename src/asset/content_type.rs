use serde::{Deserialize, Serialize};
use std::{fmt, fs::File, io, io::Read, path::Path, str::FromStr};

/// Leading bytes read from an upload when sniffing its type.
const SNIFF_LEN: u64 = 8192;

/// Content types accepted for slide assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetMime {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "video/mp4")]
    Mp4,
    #[serde(rename = "video/webm")]
    Webm,
    #[serde(rename = "video/ogg")]
    Ogg,
}

impl AssetMime {
    pub const ALL: [AssetMime; 6] = [
        AssetMime::Png,
        AssetMime::Jpeg,
        AssetMime::Gif,
        AssetMime::Mp4,
        AssetMime::Webm,
        AssetMime::Ogg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetMime::Png => "image/png",
            AssetMime::Jpeg => "image/jpeg",
            AssetMime::Gif => "image/gif",
            AssetMime::Mp4 => "video/mp4",
            AssetMime::Webm => "video/webm",
            AssetMime::Ogg => "video/ogg",
        }
    }

    /// The part after the `/`, used as the stored file extension.
    pub fn subtype(self) -> &'static str {
        let s = self.as_str();
        &s[s.find('/').map_or(0, |i| i + 1)..]
    }

    pub fn to_mime(self) -> mime::Mime {
        self.as_str()
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
    }
}

impl fmt::Display for AssetMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedMime(pub String);

/// Exact, case-sensitive match against the allow-list.
impl FromStr for AssetMime {
    type Err = UnsupportedMime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetMime::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnsupportedMime(s.to_string()))
    }
}

/// Detect the content type of the file at `path` from its leading bytes.
///
/// Returns `None` when the content matches no known signature.
pub fn sniff(path: &Path) -> io::Result<Option<&'static str>> {
    let mut buf = Vec::with_capacity(SNIFF_LEN as usize);
    File::open(path)?.take(SNIFF_LEN).read_to_end(&mut buf)?;
    Ok(sniff_bytes(&buf))
}

pub fn sniff_bytes(buf: &[u8]) -> Option<&'static str> {
    // infer reports every Ogg stream as audio.
    if is_ogg_theora(buf) {
        return Some(AssetMime::Ogg.as_str());
    }
    infer::get(buf).map(|kind| kind.mime_type())
}

fn is_ogg_theora(buf: &[u8]) -> bool {
    if buf.len() < 27 || !buf.starts_with(b"OggS") {
        return false;
    }
    // First packet follows the 27 byte page header and its segment table.
    let start = 27 + buf[26] as usize;
    buf.get(start..start + 7)
        .is_some_and(|packet| packet == b"\x80theora")
}
