//! Container detection from magic numbers.

/// Bytes needed to see two MPEG-TS / M2TS packet sync markers.
pub const MIN_SNIFF_BYTES: usize = 200;

const TS_PACKET: usize = 188;
const M2TS_PACKET: usize = 192;

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];
const ASF_GUID: [u8; 16] = [
    0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11, 0xA6, 0xD9, 0x00, 0xAA, 0x00, 0x62, 0xCE, 0x6C,
];

/// A container recognised from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Short container name (e.g. "mp4", "webm").
    pub container: &'static str,
    /// Demuxer names a metadata probe reports for this container.
    pub demuxers: &'static [&'static str],
    /// Codec implied by the header alone, if any.
    pub codec_hint: Option<&'static str>,
}

impl Signature {
    const fn new(container: &'static str, demuxers: &'static [&'static str]) -> Self {
        Self {
            container,
            demuxers,
            codec_hint: None,
        }
    }

    /// Whether a metadata probe's demuxer name agrees with this signature.
    pub fn agrees_with<'a>(&self, mut names: impl Iterator<Item = &'a str>) -> bool {
        names.any(|n| self.demuxers.contains(&n))
    }
}

const ISO_BMFF: &[&str] = &["mov", "mp4", "m4a", "3gp", "3g2", "mj2"];

/// Identifies the container from the first bytes of a file.
pub fn sniff(header: &[u8]) -> Option<Signature> {
    if header.len() >= 12 && &header[4..8] == b"ftyp" {
        return Some(iso_bmff_brand(&header[8..12]));
    }
    if header.starts_with(&EBML_MAGIC) {
        // The DocType element sits within the first few dozen bytes.
        let is_webm = header.windows(4).any(|w| w == b"webm");
        let container = if is_webm { "webm" } else { "matroska" };
        return Some(Signature::new(container, &["matroska", "webm"]));
    }
    if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..11] == b"AVI" {
        return Some(Signature::new("avi", &["avi"]));
    }
    if header.starts_with(b"FLV") {
        return Some(Signature::new("flv", &["flv"]));
    }
    if header.starts_with(&ASF_GUID) {
        return Some(Signature::new("asf", &["asf"]));
    }
    if header.starts_with(b"OggS") {
        return Some(Signature::new("ogg", &["ogg"]));
    }
    if header.starts_with(&[0x00, 0x00, 0x01, 0xBA]) {
        return Some(Signature::new("mpeg-ps", &["mpeg", "vob"]));
    }
    if header.starts_with(&[0x00, 0x00, 0x01, 0xB3]) {
        return Some(Signature {
            codec_hint: Some("mpeg1video"),
            ..Signature::new("mpeg-video", &["mpegvideo", "mpeg"])
        });
    }
    if header.len() > TS_PACKET && header[0] == 0x47 && header[TS_PACKET] == 0x47 {
        return Some(Signature::new("mpegts", &["mpegts"]));
    }
    if header.len() > M2TS_PACKET + 4 && header[4] == 0x47 && header[M2TS_PACKET + 4] == 0x47 {
        return Some(Signature::new("m2ts", &["mpegts"]));
    }
    None
}

fn iso_bmff_brand(brand: &[u8]) -> Signature {
    let container = match brand {
        b"qt  " => "mov",
        b"M4V " | b"M4VH" | b"M4VP" => "m4v",
        b if b.starts_with(b"3gp") || b.starts_with(b"3g2") => "3gp",
        _ => "mp4",
    };
    Signature::new(container, ISO_BMFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
        let mut header = vec![0x00, 0x00, 0x00, 0x20];
        header.extend_from_slice(b"ftyp");
        header.extend_from_slice(brand);
        header.extend_from_slice(&[0u8; 20]);
        header
    }

    #[test]
    fn test_iso_bmff_brands() {
        assert_eq!(sniff(&ftyp(b"isom")).unwrap().container, "mp4");
        assert_eq!(sniff(&ftyp(b"qt  ")).unwrap().container, "mov");
        assert_eq!(sniff(&ftyp(b"3gp5")).unwrap().container, "3gp");
        assert_eq!(sniff(&ftyp(b"M4V ")).unwrap().container, "m4v");
    }

    #[test]
    fn test_ebml() {
        let mut header = EBML_MAGIC.to_vec();
        header.extend_from_slice(&[0x9F, 0x42, 0x86, 0x81, 0x01, 0x42, 0x82, 0x84]);
        header.extend_from_slice(b"webm");
        assert_eq!(sniff(&header).unwrap().container, "webm");

        let mut header = EBML_MAGIC.to_vec();
        header.extend_from_slice(b"\x42\x82\x88matroska");
        assert_eq!(sniff(&header).unwrap().container, "matroska");
    }

    #[test]
    fn test_riff_flv_ogg_asf() {
        let mut avi = b"RIFF".to_vec();
        avi.extend_from_slice(&[0, 0, 0, 0]);
        avi.extend_from_slice(b"AVI LIST");
        assert_eq!(sniff(&avi).unwrap().container, "avi");

        assert_eq!(sniff(b"FLV\x01\x05\x00\x00\x00\x09").unwrap().container, "flv");
        assert_eq!(sniff(b"OggS\x00\x02").unwrap().container, "ogg");
        assert_eq!(sniff(&ASF_GUID).unwrap().container, "asf");
    }

    #[test]
    fn test_mpeg_streams() {
        let ps = sniff(&[0x00, 0x00, 0x01, 0xBA, 0x44]).unwrap();
        assert_eq!(ps.container, "mpeg-ps");

        let es = sniff(&[0x00, 0x00, 0x01, 0xB3, 0x14]).unwrap();
        assert_eq!(es.codec_hint, Some("mpeg1video"));

        let mut ts = vec![0u8; MIN_SNIFF_BYTES];
        ts[0] = 0x47;
        ts[TS_PACKET] = 0x47;
        assert_eq!(sniff(&ts).unwrap().container, "mpegts");

        let mut m2ts = vec![0u8; MIN_SNIFF_BYTES];
        m2ts[4] = 0x47;
        m2ts[M2TS_PACKET + 4] = 0x47;
        assert_eq!(sniff(&m2ts).unwrap().container, "m2ts");
    }

    #[test]
    fn test_single_sync_byte_is_not_ts() {
        let mut header = vec![0u8; MIN_SNIFF_BYTES];
        header[0] = 0x47;
        assert_eq!(sniff(&header), None);
    }

    #[test]
    fn test_unknown_and_short() {
        assert_eq!(sniff(b""), None);
        assert_eq!(sniff(b"hello world, not a video"), None);
    }

    #[test]
    fn test_agreement() {
        let sig = sniff(&ftyp(b"isom")).unwrap();
        assert!(sig.agrees_with("mov,mp4,m4a,3gp,3g2,mj2".split(',')));
        assert!(!sig.agrees_with("matroska,webm".split(',')));
    }
}
