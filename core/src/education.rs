use anyhow::{Result, bail};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Topic {
    pub title: &'static str,
    pub body: &'static str,
}

pub static TOPICS: &[Topic] = &[
    Topic {
        title: "Understanding Macronutrients",
        body: "Macronutrients are the nutrients that your body needs in large amounts:

1. Proteins: Essential for building and repairing tissues.
2. Carbohydrates: The body's main source of energy.
3. Fats: Important for nutrient absorption, nerve transmission, and maintaining cell membranes.

A balanced diet typically includes all three macronutrients in appropriate proportions.",
    },
    Topic {
        title: "The Importance of Micronutrients",
        body: "Micronutrients are vitamins and minerals that your body needs in smaller amounts:

- Vitamins: Organic compounds needed for various bodily functions.
- Minerals: Inorganic elements that play crucial roles in bodily processes.

While needed in smaller quantities, micronutrients are essential for overall health and well-being.",
    },
    Topic {
        title: "Healthy Eating Habits",
        body: "Developing healthy eating habits is crucial for maintaining good health:

1. Eat a variety of foods from all food groups.
2. Control portion sizes.
3. Choose whole grains over refined grains.
4. Include plenty of fruits and vegetables in your diet.
5. Limit processed foods and added sugars.
6. Stay hydrated by drinking plenty of water.
7. Practice mindful eating.",
    },
    Topic {
        title: "Reading Nutrition Labels",
        body: "Understanding nutrition labels can help you make informed food choices:

1. Check the serving size and servings per container.
2. Look at the calorie content.
3. Pay attention to the % Daily Value (%DV).
4. Limit saturated fats, trans fats, cholesterol, and sodium.
5. Ensure you're getting enough fiber, vitamins, and minerals.
6. Check the ingredient list for added sugars and unhealthy additives.",
    },
    Topic {
        title: "The Role of Fiber in Diet",
        body: "Fiber is a type of carbohydrate that the body can't digest. It's important because it:

1. Promotes regular bowel movements and prevents constipation.
2. Helps maintain bowel health.
3. Lowers cholesterol levels.
4. Helps control blood sugar levels.
5. Aids in achieving a healthy weight.

Good sources of fiber include fruits, vegetables, whole grains, and legumes.",
    },
];

/// Look a topic up by 1-based index, full title, or a unique title fragment.
pub fn find_topic(query: &str) -> Result<&'static Topic> {
    let query = query.trim();
    if let Ok(n) = query.parse::<usize>() {
        return match n.checked_sub(1).and_then(|i| TOPICS.get(i)) {
            Some(t) => Ok(t),
            None => bail!("Topic number must be between 1 and {}", TOPICS.len()),
        };
    }

    if let Some(t) = TOPICS.iter().find(|t| t.title.eq_ignore_ascii_case(query)) {
        return Ok(t);
    }

    let q = query.to_lowercase();
    let matches: Vec<&Topic> = TOPICS
        .iter()
        .filter(|t| !q.is_empty() && t.title.to_lowercase().contains(&q))
        .collect();
    match matches.as_slice() {
        [t] => Ok(*t),
        [] => bail!("No topic matching '{query}'"),
        _ => bail!(
            "'{query}' matches several topics: {}",
            matches
                .iter()
                .map(|t| t.title)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
