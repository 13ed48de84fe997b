use gtk4::prelude::*;
use gtk4 as gtk;
use log::warn;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::api::client::{ApiClient, ApiError};
use crate::api::models::{Badge, BadgeProgress, EarnedBadge, Profile, Role};

struct BadgesData {
    profile: Profile,
    catalog: Vec<Badge>,
    earned: Vec<EarnedBadge>,
    progress: Vec<BadgeProgress>,
}

pub struct BadgesView {
    root: gtk::Box,
    profile_label: gtk::Label,
    bio_label: gtk::Label,
    list: gtk::ListBox,
}

impl BadgesView {
    pub fn new() -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let profile_label = gtk::Label::new(Some("Profile"));
        profile_label.add_css_class("title-2");
        profile_label.set_halign(gtk::Align::Start);
        root.append(&profile_label);

        let bio_label = gtk::Label::new(None);
        bio_label.add_css_class("dim-label");
        bio_label.set_halign(gtk::Align::Start);
        bio_label.set_wrap(true);
        root.append(&bio_label);

        root.append(&gtk::Separator::new(gtk::Orientation::Horizontal));

        let badges_title = gtk::Label::new(Some("Badges"));
        badges_title.add_css_class("heading");
        badges_title.set_halign(gtk::Align::Start);
        root.append(&badges_title);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let list = gtk::ListBox::new();
        list.add_css_class("boxed-list");
        list.set_selection_mode(gtk::SelectionMode::None);
        scroller.set_child(Some(&list));
        root.append(&scroller);

        Rc::new(Self {
            root,
            profile_label,
            bio_label,
            list,
        })
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn reload(self: &Rc<Self>) {
        let session = crate::app::Session::load();
        if !session.logged_in() {
            return;
        }
        let account_id = session.account_id.clone();
        let client = ApiClient::from_session(&session);
        let rx = crate::utils::run_async_to_main(async move {
            let profile = client.profile(&account_id).await?;
            let catalog = client.badge_catalog().await?;
            let earned = client.earned_badges(&account_id).await?;
            let progress = client.badge_progress(&account_id).await?;
            Ok::<_, ApiError>(BadgesData {
                profile,
                catalog,
                earned,
                progress,
            })
        });
        let view = self.clone();
        rx.attach(None, move |res| {
            match res {
                Ok(data) => view.render(data),
                Err(e) => warn!("badge refresh failed: {e}"),
            }
            glib::ControlFlow::Continue
        });
    }

    fn render(&self, data: BadgesData) {
        self.profile_label
            .set_label(&format!("{} — {}", data.profile.display_name, role_label(data.profile.role)));
        self.bio_label.set_label(data.profile.bio.as_deref().unwrap_or(""));

        let earned_ids: HashSet<&str> =
            data.earned.iter().map(|e| e.badge.id.as_str()).collect();
        let awarded_at: HashMap<&str, &EarnedBadge> =
            data.earned.iter().map(|e| (e.badge.id.as_str(), e)).collect();
        let progress_by_id: HashMap<&str, &BadgeProgress> =
            data.progress.iter().map(|p| (p.badge_id.as_str(), p)).collect();

        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        for badge in &data.catalog {
            self.list.append(&badge_row(badge, &earned_ids, &awarded_at, &progress_by_id));
        }
    }
}

fn badge_row(
    badge: &Badge,
    earned_ids: &HashSet<&str>,
    awarded_at: &HashMap<&str, &EarnedBadge>,
    progress_by_id: &HashMap<&str, &BadgeProgress>,
) -> gtk::ListBoxRow {
    let row = gtk::ListBoxRow::new();
    row.set_activatable(false);
    let cell = gtk::Box::new(gtk::Orientation::Vertical, 4);
    cell.set_margin_top(8);
    cell.set_margin_bottom(8);
    cell.set_margin_start(8);
    cell.set_margin_end(8);

    let earned = earned_ids.contains(badge.id.as_str())
        || progress_by_id
            .get(badge.id.as_str())
            .map(|p| p.achieved)
            .unwrap_or(false);

    let header = gtk::Box::new(gtk::Orientation::Horizontal, 6);
    let name = gtk::Label::new(Some(&badge.name));
    name.add_css_class("heading");
    name.set_halign(gtk::Align::Start);
    name.set_hexpand(true);
    header.append(&name);
    if let Some(e) = awarded_at.get(badge.id.as_str()) {
        let when = gtk::Label::new(Some(&format!(
            "Earned {}",
            e.awarded_at.format("%Y-%m-%d")
        )));
        when.add_css_class("dim-label");
        header.append(&when);
    }
    cell.append(&header);

    let description = gtk::Label::new(Some(&badge.description));
    description.add_css_class("dim-label");
    description.set_halign(gtk::Align::Start);
    description.set_wrap(true);
    cell.append(&description);

    let bar = gtk::ProgressBar::new();
    bar.set_show_text(true);
    if earned {
        bar.set_fraction(1.0);
        bar.set_text(Some("Achieved"));
    } else {
        let percent = progress_by_id
            .get(badge.id.as_str())
            .map(|p| p.percent())
            .unwrap_or(0.0);
        bar.set_fraction(f64::from(percent) / 100.0);
        bar.set_text(Some(&format!("{:.0}%", percent)));
    }
    cell.append(&bar);

    row.set_child(Some(&cell));
    row
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Bakery => "Bakery",
        Role::Charity => "Charity",
        Role::Admin => "Administrator",
    }
}
