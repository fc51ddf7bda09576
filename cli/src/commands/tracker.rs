use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use caltrack_core::service::CalTrackService;

use super::helpers::print_json;

pub(crate) fn tracker_connect(svc: &mut CalTrackService, json: bool) -> Result<()> {
    svc.connect_tracker()?;
    print_status(svc, json)
}

pub(crate) fn tracker_disconnect(svc: &mut CalTrackService, json: bool) -> Result<()> {
    svc.disconnect_tracker();
    print_status(svc, json)
}

pub(crate) fn tracker_status(svc: &CalTrackService, json: bool) -> Result<()> {
    print_status(svc, json)
}

fn print_status(svc: &CalTrackService, json: bool) -> Result<()> {
    let last_sync = svc
        .last_sync()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string());
    if json {
        return print_json(&serde_json::json!({
            "connected": svc.tracker_connected(),
            "calorie_goal": svc.calorie_goal(),
            "last_sync": last_sync,
        }));
    }
    if svc.tracker_connected() {
        println!("Your fitness tracker is connected!");
    } else {
        println!("No fitness tracker connected.");
    }
    println!("Current daily calorie goal: {} calories", svc.calorie_goal());
    println!("Last sync: {}", last_sync.as_deref().unwrap_or("Never"));
    Ok(())
}

pub(crate) fn tracker_dashboard(
    svc: &mut CalTrackService,
    days: Option<u32>,
    today: NaiveDate,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Steps")]
        steps: u32,
        #[tabled(rename = "Calories Burned")]
        calories: u32,
        #[tabled(rename = "Active Minutes")]
        active: u32,
        #[tabled(rename = "Heart Rate")]
        heart_rate: u32,
    }

    if !svc.tracker_connected() {
        bail!("Please connect your fitness tracker to view the dashboard (`tracker connect`)");
    }
    let dash = svc.activity_dashboard(days, today)?;
    if json {
        return print_json(&dash);
    }

    let s = &dash.summary;
    println!("Summary (last {} days):", s.days);
    println!("  Avg. daily steps:     {:.0}", s.avg_steps);
    println!("  Avg. calories burned: {:.0}", s.avg_calories_burned);
    println!("  Avg. active minutes:  {:.0}", s.avg_active_minutes);
    println!("  Avg. heart rate:      {:.0}\n", s.avg_heart_rate);

    let rows: Vec<DayRow> = dash
        .records
        .iter()
        .map(|r| DayRow {
            date: r.date.format("%Y-%m-%d").to_string(),
            steps: r.steps,
            calories: r.calories_burned,
            active: r.active_minutes,
            heart_rate: r.heart_rate,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn tracker_sync(svc: &mut CalTrackService, json: bool) -> Result<()> {
    if !svc.tracker_connected() {
        bail!("Please connect your fitness tracker to sync data (`tracker connect`)");
    }
    let outcome = svc.sync_tracker(Local::now().naive_local())?;
    if json {
        return print_json(&outcome);
    }
    println!("Data synced successfully!");
    println!(
        "Average calories burned: {:.0} kcal/day",
        outcome.avg_calories_burned
    );
    println!(
        "Your new daily calorie goal is: {} calories",
        outcome.calorie_goal
    );
    println!("Last sync: {}", outcome.synced_at);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use caltrack_core::tracker::MockFitnessTracker;

    fn seeded() -> CalTrackService {
        CalTrackService::with_tracker(Box::new(MockFitnessTracker::with_seed(4)))
    }

    #[test]
    fn test_dashboard_and_sync_need_connection() {
        let mut svc = seeded();
        let today = Local::now().date_naive();
        assert!(tracker_dashboard(&mut svc, None, today, false).is_err());
        assert!(tracker_sync(&mut svc, false).is_err());

        tracker_connect(&mut svc, false).unwrap();
        tracker_dashboard(&mut svc, Some(3), today, false).unwrap();
        tracker_sync(&mut svc, true).unwrap();
        assert!(svc.last_sync().is_some());

        tracker_disconnect(&mut svc, false).unwrap();
        assert!(!svc.tracker_connected());
        tracker_status(&svc, true).unwrap();
    }
}
