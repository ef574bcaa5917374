//! Plain-text rendering of folders, message lists and single messages

use mail::{Folder, Importance, Message, Paginator};

/// Folder name indented under its parent
fn folder_label(folder: &Folder) -> String {
    match folder.parent() {
        Some(_) => format!("{}└ {}", "  ".repeat(folder.depth() - 1), folder.name),
        None => folder.name.clone(),
    }
}

pub fn print_folders(folders: &[Folder]) {
    println!("{:<28} {:>7} {:>7}", "FOLDER", "TOTAL", "UNREAD");
    for folder in folders {
        println!(
            "{:<28} {:>7} {:>7}",
            folder_label(folder),
            folder.message_count,
            folder.unread_count
        );
    }
}

fn flags(message: &Message) -> String {
    let mut flags = String::with_capacity(3);
    flags.push(if message.is_read { ' ' } else { '*' });
    flags.push(if message.has_attachments { '@' } else { ' ' });
    flags.push(match message.importance {
        Importance::High => '!',
        Importance::Low => '-',
        Importance::Normal => ' ',
    });
    flags
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn print_message_line(message: &Message) {
    let sender = message
        .from
        .name
        .as_deref()
        .unwrap_or(message.from.email.as_str());
    println!(
        "{} {:<14} {} {:<24} {}",
        flags(message),
        truncate(message.id.as_str(), 14),
        message.received_at.format("%Y-%m-%d %H:%M"),
        truncate(sender, 24),
        truncate(&message.subject, 60)
    );
}

/// Hint for reaching the neighbouring pages, if any
fn page_navigation(pager: &Paginator<Message>) -> Option<String> {
    let current = pager.current_page_number();
    match (pager.is_first_page(), pager.is_last_page()) {
        (true, true) => None,
        (true, false) => Some(format!("next: --page {}", current + 1)),
        (false, true) => Some(format!("previous: --page {}", current - 1)),
        (false, false) => Some(format!(
            "previous: --page {}, next: --page {}",
            current - 1,
            current + 1
        )),
    }
}

pub fn print_page(pager: &Paginator<Message>) {
    let info = pager.get_page_info();
    if info.total_items == 0 {
        println!("No messages found.");
        return;
    }
    for message in pager.get_current_page() {
        print_message_line(message);
    }
    println!(
        "\nPage {} of {} ({} messages, {} per page)",
        info.current_page, info.total_pages, info.total_items, info.items_per_page
    );
    if let Some(navigation) = page_navigation(pager) {
        println!("{}", navigation);
    }
}

pub fn print_message(message: &Message) {
    let join = |list: &[mail::EmailAddress]| {
        list.iter()
            .map(|a| a.display())
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("Id:          {}", message.id);
    println!("Folder:      {}", message.folder_path);
    println!("From:        {}", message.from.display());
    println!("To:          {}", join(&message.to));
    if !message.cc.is_empty() {
        println!("Cc:          {}", join(&message.cc));
    }
    println!("Date:        {}", message.received_at.to_rfc2822());
    println!("Subject:     {}", message.subject);
    println!("Importance:  {}", message.importance);
    if message.has_attachments {
        println!(
            "Attachments: {} ({})",
            message.attachment_count,
            message.attachment_names.join(", ")
        );
    }
    println!();
    println!("{}", message.body_text);
}
