use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for validating display names
    /// Letters (any script via explicit ranges kept simple: ASCII), digits,
    /// spaces, hyphens and apostrophes; must start with a letter
    /// - Valid: "Jane", "Jane Doe", "O'Brien", "Ana-Maria"
    /// - Invalid: " Jane", "-Jane", "Jane_", ""
    pub static ref DISPLAY_NAME_REGEX: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9' -]*$").unwrap();

    /// Regex for validating uploaded image file names
    /// Base name of alphanumerics, dots, hyphens and underscores with a
    /// jpg/jpeg/png/webp extension
    /// - Valid: "pothole.jpg", "street_lamp-2.png"
    /// - Invalid: "../etc/passwd", "photo", "shot.exe"
    pub static ref IMAGE_FILE_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9._-]+\.(?:jpg|jpeg|png|webp)$").unwrap();
}
