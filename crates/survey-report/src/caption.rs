//! The one-line caption printed under each photo.

use survey_core::photo::Photo;

/// Marker printed when the photo shows peeling.
pub const PEELING: &str = "剝落";
/// Marker printed when the photo shows seepage.
pub const SEEPAGE: &str = "滲水";
/// Prefix of the crack width token.
pub const CRACK_PREFIX: &str = "裂縫:";

/// Build the caption for `photo`.
///
/// Tokens appear in a fixed order: two-digit sequence, position, material,
/// crack width, peeling, seepage, remark. Blank text and unset flags add no
/// token, and tokens are joined by single spaces.
pub fn caption(photo: &Photo) -> String {
  let a = &photo.annotation;
  let mut tokens = vec![format!("{:02}", photo.sequence)];

  let mut push_text = |value: &str, prefix: &str| {
    let value = value.trim();
    if !value.is_empty() {
      tokens.push(format!("{prefix}{value}"));
    }
  };
  push_text(&a.position, "");
  push_text(&a.material, "");
  push_text(&a.crack_width, CRACK_PREFIX);

  if a.peeling {
    tokens.push(PEELING.to_owned());
  }
  if a.seepage {
    tokens.push(SEEPAGE.to_owned());
  }

  let remark = a.remark.trim();
  if !remark.is_empty() {
    tokens.push(remark.to_owned());
  }

  tokens.join(" ")
}
