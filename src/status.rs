// this_file: src/status.rs
//! Font engine status codes and their messages.
//!
//! Codes follow the numbering long used by FreeType so that errors read the
//! same regardless of which face engine produced them.

pub const OK: u16 = 0x00;
pub const CANNOT_OPEN_RESOURCE: u16 = 0x01;
pub const UNKNOWN_FILE_FORMAT: u16 = 0x02;
pub const INVALID_FILE_FORMAT: u16 = 0x03;
pub const INVALID_ARGUMENT: u16 = 0x06;
pub const UNIMPLEMENTED_FEATURE: u16 = 0x07;
pub const INVALID_TABLE: u16 = 0x08;
pub const INVALID_GLYPH_INDEX: u16 = 0x10;
pub const INVALID_CHARACTER_CODE: u16 = 0x11;
pub const INVALID_GLYPH_FORMAT: u16 = 0x12;
pub const CANNOT_RENDER_GLYPH: u16 = 0x13;
pub const INVALID_OUTLINE: u16 = 0x14;
pub const INVALID_PIXEL_SIZE: u16 = 0x17;
pub const INVALID_FACE_HANDLE: u16 = 0x23;
pub const INVALID_CHARMAP_HANDLE: u16 = 0x26;
pub const OUT_OF_MEMORY: u16 = 0x40;
pub const CANNOT_OPEN_STREAM: u16 = 0x51;
pub const TABLE_MISSING: u16 = 0x8E;
pub const CMAP_TABLE_MISSING: u16 = 0x92;

static MESSAGES: &[(u16, &str)] = &[
    (OK, "no error"),
    (CANNOT_OPEN_RESOURCE, "cannot open resource"),
    (UNKNOWN_FILE_FORMAT, "unknown file format"),
    (INVALID_FILE_FORMAT, "broken file"),
    (0x04, "invalid FreeType version"),
    (0x05, "module version is too low"),
    (INVALID_ARGUMENT, "invalid argument"),
    (UNIMPLEMENTED_FEATURE, "unimplemented feature"),
    (INVALID_TABLE, "broken table"),
    (0x09, "broken offset within table"),
    (0x0A, "array allocation size too large"),
    (0x0B, "missing module"),
    (0x0C, "missing property"),
    (INVALID_GLYPH_INDEX, "invalid glyph index"),
    (INVALID_CHARACTER_CODE, "invalid character code"),
    (INVALID_GLYPH_FORMAT, "unsupported glyph image format"),
    (CANNOT_RENDER_GLYPH, "cannot render this glyph format"),
    (INVALID_OUTLINE, "invalid outline"),
    (0x15, "invalid composite glyph"),
    (0x16, "too many hints"),
    (INVALID_PIXEL_SIZE, "invalid pixel size"),
    (0x20, "invalid object handle"),
    (0x21, "invalid library handle"),
    (0x22, "invalid module handle"),
    (INVALID_FACE_HANDLE, "invalid face handle"),
    (0x24, "invalid size handle"),
    (0x25, "invalid glyph slot handle"),
    (INVALID_CHARMAP_HANDLE, "invalid charmap handle"),
    (0x27, "invalid cache manager handle"),
    (0x28, "invalid stream handle"),
    (OUT_OF_MEMORY, "out of memory"),
    (0x41, "unlisted object"),
    (CANNOT_OPEN_STREAM, "cannot open stream"),
    (0x52, "invalid stream seek"),
    (0x53, "invalid stream skip"),
    (0x54, "invalid stream read"),
    (0x55, "invalid stream operation"),
    (0x60, "raster uninitialized"),
    (0x61, "raster corrupted"),
    (0x62, "raster overflow"),
    (0x63, "negative height while rastering"),
    (TABLE_MISSING, "SFNT font table missing"),
    (0x8F, "horizontal header (hhea) table missing"),
    (0x90, "locations (loca) table missing"),
    (0x91, "name table missing"),
    (CMAP_TABLE_MISSING, "character map (cmap) table missing"),
    (0x93, "horizontal metrics (hmtx) table missing"),
    (0x94, "PostScript (post) table missing"),
    (0x95, "invalid horizontal metrics"),
    (0x96, "invalid character map (cmap) format"),
    (0x97, "invalid ppem value"),
    (0x98, "invalid vertical metrics"),
];

/// Resolve a status code to its message.
pub fn describe(code: u16) -> &'static str {
    MESSAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, message)| *message)
        .unwrap_or("unknown font engine error")
}
