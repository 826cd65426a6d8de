use serde::Serialize;
use tera::{Context, Tera};

use quickstart_core::{Contact, QuickstartError, TimelineItem};

pub const INDEX_TEMPLATE: &str = "index.html";

pub fn load() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))?;
    Ok(tera)
}

/// Everything the dashboard page shows.
#[derive(Debug, Serialize)]
pub struct DashboardPage {
    pub display_name: String,
    pub message: Option<String>,
    pub timeline_items: Vec<TimelineItem>,
    pub contact: Option<Contact>,
    pub contact_id: String,
    pub contact_image: String,
    pub timeline_subscription_exists: bool,
    pub location_subscription_exists: bool,
}

pub fn render_dashboard(tera: &Tera, page: &DashboardPage) -> Result<String, QuickstartError> {
    let context = Context::from_serialize(page)
        .map_err(|e| QuickstartError::new("template_error", Some(&e.to_string())))?;
    tera.render(INDEX_TEMPLATE, &context)
        .map_err(|e| QuickstartError::new("template_error", Some(&e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickstart_core::Attachment;

    fn page() -> DashboardPage {
        DashboardPage {
            display_name: "Mirror Quickstart".to_string(),
            message: None,
            timeline_items: Vec::new(),
            contact: None,
            contact_id: "Mirror_Quickstart".to_string(),
            contact_image: "/static/images/quickstart.svg".to_string(),
            timeline_subscription_exists: false,
            location_subscription_exists: false,
        }
    }

    #[test]
    fn empty_dashboard_renders() {
        let tera = load().unwrap();
        let html = render_dashboard(&tera, &page()).unwrap();
        assert!(html.contains("Mirror Quickstart"));
        assert!(html.contains("name=\"operation\" value=\"insertSubscription\""));
        assert!(html.contains("value=\"insertContact\""));
    }

    #[test]
    fn message_and_items_are_escaped() {
        let tera = load().unwrap();
        let mut page = page();
        page.message = Some("<b>hi</b>".to_string());
        page.timeline_items = vec![TimelineItem {
            id: Some("item-1".to_string()),
            text: Some("lunch & coffee".to_string()),
            attachments: vec![Attachment {
                id: "att-1".to_string(),
                content_type: "image/jpeg".to_string(),
                ..Attachment::default()
            }],
            ..TimelineItem::default()
        }];

        let html = render_dashboard(&tera, &page).unwrap();
        assert!(html.contains("&lt;b&gt;hi&lt;&#x2F;b&gt;"));
        assert!(html.contains("lunch &amp; coffee"));
        assert!(html.contains("/attachmentproxy?attachment=att-1&amp;timelineItem=item-1"));
    }

    #[test]
    fn subscription_state_toggles_buttons() {
        let tera = load().unwrap();
        let mut page = page();
        page.timeline_subscription_exists = true;

        let html = render_dashboard(&tera, &page).unwrap();
        assert!(html.contains("name=\"subscriptionId\" value=\"timeline\""));
        assert!(html.contains("name=\"collection\" value=\"locations\""));
    }
}
