use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{AlertError, Result};
use crate::format::{AlertPayload, Urgency};

const TEMPLATE_NAME: &str = "expiry_alert";

#[derive(Serialize)]
struct RenderItem<'a> {
    name: &'a str,
    category: &'a str,
    expiry_date: String,
    days_label: String,
    urgency: Urgency,
    color: &'static str,
}

#[derive(Serialize)]
struct RenderContext<'a> {
    app_name: &'a str,
    today: String,
    total: usize,
    critical_count: usize,
    items: Vec<RenderItem<'a>>,
}

fn color(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Critical => "red",
        Urgency::Warning => "orange",
        Urgency::Info => "green",
    }
}

fn days_label(days: i64) -> String {
    if days == 1 || days == -1 {
        format!("{days} day")
    } else {
        format!("{days} days")
    }
}

/// HTML body renderer. Values are HTML-escaped by the template engine.
pub struct AlertRenderer {
    templates: Handlebars<'static>,
}

impl AlertRenderer {
    pub fn new() -> Result<Self> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);
        templates
            .register_template_string(TEMPLATE_NAME, include_str!("../templates/expiry_alert.hbs"))
            .map_err(|e| AlertError::Internal(format!("alert template: {e}")))?;
        Ok(Self { templates })
    }

    pub fn render_html(&self, payload: &AlertPayload, app_name: &str) -> Result<String> {
        let ctx = RenderContext {
            app_name,
            today: payload.today.format("%d/%m/%Y").to_string(),
            total: payload.total,
            critical_count: payload.critical_count(),
            items: payload
                .items
                .iter()
                .map(|item| RenderItem {
                    name: &item.name,
                    category: &item.category,
                    expiry_date: item.expiry_date.to_string(),
                    days_label: days_label(item.days_until_expiry),
                    urgency: item.urgency,
                    color: color(item.urgency),
                })
                .collect(),
        };
        self.templates
            .render(TEMPLATE_NAME, &ctx)
            .map_err(|e| AlertError::Internal(format!("render alert: {e}")))
    }
}
