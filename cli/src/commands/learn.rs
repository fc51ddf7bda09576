use anyhow::Result;

use caltrack_core::education::{TOPICS, find_topic};

use super::helpers::print_json;

pub(crate) fn cmd_learn(topic: Option<&str>, json: bool) -> Result<()> {
    let Some(query) = topic else {
        if json {
            let titles: Vec<&str> = TOPICS.iter().map(|t| t.title).collect();
            return print_json(&titles);
        }
        println!("Nutrition topics:\n");
        for (i, t) in TOPICS.iter().enumerate() {
            println!("  {}. {}", i + 1, t.title);
        }
        println!("\nShow one with `caltrack learn <number or title>`");
        return Ok(());
    };

    let topic = find_topic(query)?;
    if json {
        return print_json(topic);
    }
    println!("=== {} ===\n", topic.title);
    println!("{}", topic.body);
    Ok(())
}
