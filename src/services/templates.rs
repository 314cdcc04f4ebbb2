//! Email template rendering with Handlebars.
//!
//! Templates are HTML files embedded at build time; the plain-text
//! alternative is derived from the rendered HTML.

use handlebars::Handlebars;
use rust_embed::RustEmbed;
use serde::Serialize;

use super::mailer::MailError;

#[derive(RustEmbed)]
#[folder = "templates/email/"]
struct EmailTemplates;

const TEXT_WIDTH: usize = 78;

pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self, MailError> {
        let mut handlebars = Handlebars::new();

        // Enable strict mode to catch undefined variables
        handlebars.set_strict_mode(true);

        for file in EmailTemplates::iter() {
            let Some(name) = file.strip_suffix(".hbs") else {
                continue;
            };
            let Some(content) = EmailTemplates::get(&file) else {
                continue;
            };
            let source = String::from_utf8_lossy(&content.data);
            handlebars
                .register_template_string(name, source.as_ref())
                .map_err(|e| MailError::Template {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(Self { handlebars })
    }

    /// Returns `(html_body, text_body)`.
    pub fn render<T: Serialize>(&self, name: &str, vars: &T) -> Result<(String, String), MailError> {
        let html = self
            .handlebars
            .render(name, vars)
            .map_err(|e| MailError::Template {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let text = html2text::from_read(html.as_bytes(), TEXT_WIDTH).map_err(|e| {
            MailError::Template {
                name: name.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok((html, text))
    }
}
