use super::OutgoingMail;

pub fn verification(to: &str, first_name: &str, verify_url: &str) -> OutgoingMail {
    let html = format!(
        r#"<html>
  <body style="font-family: Arial, sans-serif; line-height: 1.6; background:#f9f9f9; padding:20px; color:#222;">
    <div style="max-width:520px; margin:auto; padding:25px; background:#ffffff; border-radius:8px;">
      <h2 style="color:#007BFF; font-weight:600;">Welcome to SkillSwap!</h2>
      <p>Hi {name},</p>
      <p>Click the button below to verify your account:</p>
      <p style="text-align:center;">
        <a href="{url}" style="display:inline-block; padding:12px 24px; background-color:#007BFF; color:#ffffff;
           text-decoration:none; font-weight:600; border-radius:5px;">Verify My Account</a>
      </p>
      <p>If the button doesn't work, copy and paste this link into your browser:</p>
      <p style="word-break:break-all;"><a href="{url}">{url}</a></p>
      <hr style="border:none; border-top:1px solid #ddd; margin:25px 0;">
      <p style="font-size:13px; color:#555;">
        This email was sent by <strong>SkillSwap</strong>. If you didn't sign up for an account, please ignore this message.
      </p>
    </div>
  </body>
</html>"#,
        name = escape_html(first_name),
        url = verify_url,
    );
    OutgoingMail {
        to: to.to_string(),
        subject: "Verify your SkillSwap account".into(),
        html,
    }
}

pub fn password_reset(to: &str, reset_url: &str, ttl_minutes: i64) -> OutgoingMail {
    let html = format!(
        r#"<html>
  <body style="font-family: Arial, sans-serif; line-height:1.6;">
    <h2>Password Reset Request</h2>
    <p>Click below to reset your password:</p>
    <a href="{url}" style="background-color:#4CAF50;color:white;padding:10px 20px;text-decoration:none;border-radius:5px;">Reset Password</a>
    <p>If the button doesn't work, copy this link into your browser:</p>
    <p><a href="{url}">{url}</a></p>
    <p>This link expires in {ttl} minutes.</p>
  </body>
</html>"#,
        url = reset_url,
        ttl = ttl_minutes,
    );
    OutgoingMail {
        to: to.to_string(),
        subject: "Reset your SkillSwap password".into(),
        html,
    }
}

pub fn page(heading: &str, detail: Option<&str>) -> String {
    let detail = detail
        .map(|d| format!("<p>{}</p>", d))
        .unwrap_or_default();
    format!(
        r#"<html><body style="font-family:sans-serif;text-align:center;margin-top:10%;"><h2>{}</h2>{}</body></html>"#,
        heading, detail
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
