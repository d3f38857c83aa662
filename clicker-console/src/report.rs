use colored::Colorize;
use clicker_core::{
    AchievementRegistry, LegacyFormat, ProgressionModel, RestoreReport, SaveState, SessionOrigin,
};

fn achievement_title<'a>(registry: &'a AchievementRegistry, id: &'a str) -> &'a str {
    registry.get(id).map_or(id, |def| def.name.as_str())
}

pub fn print_state(model: &ProgressionModel, origin: SessionOrigin) {
    println!("{}", "🎮 Clicker Save".bright_cyan().bold());
    println!("{}", "================".cyan());
    match origin {
        SessionOrigin::Fresh => println!("{}", "No save yet: showing defaults".yellow()),
        SessionOrigin::Recovered => {
            println!("{}", "⚠️  Save could not be decoded: showing defaults".red());
        }
        SessionOrigin::Loaded => {}
    }

    let upgrades = model.upgrades();
    println!("Score: {}", model.score().to_string().bright_yellow().bold());
    println!("Controls visible: {}", model.controls_visible());
    println!(
        "Points per click: {}  Passive per second: {}",
        upgrades.points_per_click(),
        upgrades.passive_per_second()
    );
    println!("Mini events caught: {}", model.mini_event_clicks());

    println!();
    println!("{}", "🏆 Achievements".bright_yellow().bold());
    let tracker = model.achievements();
    for def in tracker.registry().iter() {
        if tracker.is_unlocked(&def.id) {
            println!("  ✅ {} - {}", def.name.green(), def.description);
        } else if def.is_secret() {
            println!("  🔒 {}", "???".dimmed());
        } else {
            println!("  🔒 {} - {}", def.name.dimmed(), def.description);
        }
    }
    for id in tracker
        .unlocked()
        .iter()
        .filter(|id| tracker.registry().get(id).is_none())
    {
        println!("  ✅ {} {}", id.green(), "(unknown to this build)".dimmed());
    }

    println!();
    println!("{}", "🛒 Upgrades".bright_yellow().bold());
    for def in upgrades.catalog().iter() {
        let status = if upgrades.is_purchased(&def.id) {
            "owned".green()
        } else {
            format!("{} points", def.cost).normal()
        };
        println!("  {:12} {:16} {status}", def.id, def.name);
    }
}

pub fn print_unlocks(registry: &AchievementRegistry, ids: &[&String]) {
    for id in ids {
        println!(
            "🏆 Achievement unlocked: {}",
            achievement_title(registry, id).bright_green().bold()
        );
    }
}

fn print_state_summary(state: &SaveState) {
    println!("  Score: {}", state.score.to_string().bright_yellow());
    println!("  Controls visible: {}", state.controls_visible);
    let achievements: Vec<&str> = state
        .unlocked_achievements
        .iter()
        .map(String::as_str)
        .collect();
    println!("  Achievements: {}", achievements.join(", "));
    let upgrades: Vec<&str> = state
        .purchased_upgrades
        .iter()
        .filter(|(_, purchased)| **purchased)
        .map(|(id, _)| id.as_str())
        .collect();
    println!("  Upgrades: {}", upgrades.join(", "));
}

pub fn print_restore_preview(format: LegacyFormat, state: &SaveState) {
    println!(
        "{} {}",
        "📦 Legacy backup found, format".bright_cyan(),
        format.to_string().bold()
    );
    print_state_summary(state);
}

pub fn print_restore_report(report: &RestoreReport) {
    println!(
        "{} {}",
        "✅ Restored legacy backup, format".green().bold(),
        report.format.to_string().bold()
    );
    print_state_summary(&report.restored);
    if !report.persisted {
        eprintln!("{}", "❌ Restored state could not be saved".red());
    } else if !report.backup_removed {
        eprintln!("{}", "⚠️  Legacy backup could not be deleted".yellow());
    }
}
