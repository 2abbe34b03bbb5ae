//! Confirmation email content

/// Subject line of every confirmation email.
pub const CONFIRMATION_SUBJECT: &str = "Warehouse Bridge: please confirm your email address";

/// Minutes the confirmation link is advertised as valid.
pub const CONFIRMATION_LINK_MINUTES: u32 = 30;

/// Escape text for use inside an HTML attribute or element.
pub fn html_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '+' => out.push_str("&#x2B;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML body with a single link to `callback_url`.
pub fn confirmation_body(callback_url: &str) -> String {
    format!(
        r#"<style>
    body {{ font-family: Arial, sans-serif; line-height: 1.5; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    h1 {{ color: #333; }}
    p {{ margin-bottom: 20px; }}
    .button {{ display: inline-block; background-color: #007bff; color: #fff; padding: 10px 20px; text-decoration: none; border-radius: 5px; }}
  </style>
  <div class="container">
    <h1>Confirm your email address for Warehouse Bridge</h1>
    <p>Please confirm that this is your company's official email address by clicking the button below:</p>
    <a class="button" href='{link}'>Confirm email address</a>
    <p>Please note that the confirmation link is only valid for {minutes} minutes. After that it expires and you will need to request a new confirmation.</p>
    <p>If anything about your company's email address changes, please let us know right away so we can keep your details up to date.</p>
    <p>Thank you for helping us confirm your email address.</p>
  </div>"#,
        link = html_encode(callback_url),
        minutes = CONFIRMATION_LINK_MINUTES,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_markup_and_quotes() {
        assert_eq!(
            html_encode(r#"https://x.com/c?a=1&b='2'"#),
            "https://x.com/c?a=1&amp;b=&#x27;2&#x27;"
        );
        assert_eq!(html_encode("<script>"), "&lt;script&gt;");
    }

    #[test]
    fn body_embeds_exactly_one_encoded_link() {
        let body = confirmation_body("https://app.example/confirm?token=a+b&user=1");
        assert_eq!(body.matches("href=").count(), 1);
        assert!(body.contains("href='https://app.example/confirm?token=a&#x2B;b&amp;user=1'"));
        assert!(body.contains("30 minutes"));
    }
}
