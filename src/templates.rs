use askama::Template;
use askama_web::WebTemplate;

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub(crate) struct LoginTemplate {
    pub(crate) app_name: String,
    pub(crate) error: String,
    pub(crate) declined: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "rsvp.html")]
pub(crate) struct RsvpTemplate {
    pub(crate) app_name: String,
    pub(crate) details: String,
    pub(crate) guests: Vec<GuestRow>,
}

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub(crate) struct HomeTemplate {
    pub(crate) app_name: String,
    pub(crate) username: String,
    pub(crate) is_admin: bool,
    pub(crate) is_creator: bool,
    pub(crate) is_guest: bool,
    pub(crate) details: String,
    pub(crate) editing_details: bool,
    pub(crate) guests: Vec<GuestRow>,
    pub(crate) users: Vec<UserRow>,
    pub(crate) items: Vec<ItemRow>,
    pub(crate) my_items: Vec<ItemRow>,
    pub(crate) messages: Vec<MessageRow>,
}

pub(crate) struct GuestRow {
    pub(crate) position: usize,
    pub(crate) username: String,
    pub(crate) claimed: String,
}

pub(crate) struct UserRow {
    pub(crate) username: String,
    pub(crate) delete_path: String,
}

pub(crate) struct ItemRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) details: String,
    pub(crate) max: u32,
    pub(crate) capacity: String,
    pub(crate) claimers: String,
    pub(crate) claim_label: &'static str,
    pub(crate) claimable: bool,
    pub(crate) claimed: bool,
    pub(crate) editing: bool,
}

pub(crate) struct MessageRow {
    pub(crate) id: String,
    pub(crate) user: String,
    pub(crate) text: String,
    pub(crate) posted_at: String,
    pub(crate) posted_at_iso: String,
}
