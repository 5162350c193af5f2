use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;

/// Static plant data as shipped in the game configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlantDef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub seed_id: u64,
    /// Phase list like `"sprout:30;grow:60;ripe:0;"`
    #[serde(default)]
    pub grow_phases: String,
    #[serde(default)]
    pub exp: i64,
    #[serde(default)]
    pub fruit: Option<FruitDef>,
    #[serde(default)]
    pub land_level_need: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FruitDef {
    pub id: u64,
    pub count: i64,
}

/// Plants plus the shop prices needed to value them
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlantCatalog {
    pub plants: Vec<PlantDef>,
    #[serde(default)]
    pub fruit_prices: HashMap<u64, i64>,
    #[serde(default)]
    pub seed_prices: HashMap<u64, i64>,
}

impl PlantCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn fruit_price(&self, id: u64) -> i64 {
        self.fruit_prices.get(&id).copied().unwrap_or(0)
    }

    fn seed_price(&self, id: u64) -> i64 {
        self.seed_prices.get(&id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Exp,
    FertilizedExp,
    Gold,
    Profit,
    FertilizedProfit,
    Level,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exp" => Ok(SortKey::Exp),
            "fert" => Ok(SortKey::FertilizedExp),
            "gold" => Ok(SortKey::Gold),
            "profit" => Ok(SortKey::Profit),
            "fert_profit" => Ok(SortKey::FertilizedProfit),
            "level" => Ok(SortKey::Level),
            other => Err(format!(
                "unknown sort key '{}' (expected exp, fert, gold, profit, fert_profit or level)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantRanking {
    pub id: u64,
    pub seed_id: u64,
    pub name: String,
    pub level: Option<i64>,
    pub grow_time: i64,
    pub grow_time_str: String,
    pub exp_per_hour: f64,
    pub normal_fertilizer_exp_per_hour: f64,
    /// Gross gold per hour
    pub gold_per_hour: f64,
    /// Net of seed cost
    pub profit_per_hour: f64,
    pub normal_fertilizer_profit_per_hour: f64,
    pub income: i64,
    pub net_profit: i64,
    pub fruit_id: u64,
    pub fruit_count: i64,
    pub fruit_price: i64,
    pub seed_price: i64,
}

/// Total seconds of a phase list: the sum of every `:<secs>` suffix
pub fn parse_grow_time(phases: &str) -> i64 {
    phases
        .split(';')
        .filter(|p| !p.is_empty())
        .filter_map(|p| {
            let (_, secs) = p.rsplit_once(':')?;
            if secs.is_empty() || !secs.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            secs.parse::<i64>().ok()
        })
        .fold(0i64, i64::saturating_add)
}

pub fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    if seconds < 3600 {
        return format!("{}m{}s", seconds / 60, seconds % 60);
    }
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    if mins > 0 {
        format!("{}h{}m", hours, mins)
    } else {
        format!("{}h", hours)
    }
}

/// Grow time with normal fertilizer: 20 % faster, but at least 30 s
/// faster, and never below 1 s.
pub fn fertilized_grow_time(grow_time: i64) -> f64 {
    let speedup = grow_time as f64 * 0.2;
    let fertilized = if speedup < 30.0 {
        grow_time as f64 - 30.0
    } else {
        grow_time as f64 * 0.8
    };
    if fertilized > 0.0 {
        fertilized
    } else {
        1.0
    }
}

/// Regular crops: plant id starts with `102`, seed id in 20000..30000
fn is_normal_crop(plant: &PlantDef) -> bool {
    plant.id.to_string().starts_with("102") && (20000..30000).contains(&plant.seed_id)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn per_hour(amount: f64, seconds: f64) -> f64 {
    round2(amount / seconds * 3600.0)
}

/// Efficiency table of every regular crop, sorted by `sort`
pub fn plant_rankings(catalog: &PlantCatalog, sort: SortKey) -> Vec<PlantRanking> {
    let mut results: Vec<PlantRanking> = catalog
        .plants
        .iter()
        .filter(|p| is_normal_crop(p))
        .filter_map(|plant| {
            let grow_time = parse_grow_time(&plant.grow_phases);
            if grow_time <= 0 {
                return None;
            }
            let grow = grow_time as f64;
            let fertilized = fertilized_grow_time(grow_time);

            let (fruit_id, fruit_count) = plant
                .fruit
                .as_ref()
                .map(|f| (f.id, f.count))
                .unwrap_or((0, 0));
            let fruit_price = catalog.fruit_price(fruit_id);
            let seed_price = catalog.seed_price(plant.seed_id);
            let income = fruit_count.saturating_mul(fruit_price);
            let net_profit = income.saturating_sub(seed_price);

            Some(PlantRanking {
                id: plant.id,
                seed_id: plant.seed_id,
                name: plant.name.clone(),
                level: plant.land_level_need.filter(|l| *l > 0),
                grow_time,
                grow_time_str: format_duration(grow_time),
                exp_per_hour: per_hour(plant.exp as f64, grow),
                normal_fertilizer_exp_per_hour: per_hour(plant.exp as f64, fertilized),
                gold_per_hour: per_hour(income as f64, grow),
                profit_per_hour: per_hour(net_profit as f64, grow),
                normal_fertilizer_profit_per_hour: per_hour(net_profit as f64, fertilized),
                income,
                net_profit,
                fruit_id,
                fruit_count,
                fruit_price,
                seed_price,
            })
        })
        .collect();

    let desc = |a: f64, b: f64| b.total_cmp(&a);
    match sort {
        SortKey::Exp => results.sort_by(|a, b| desc(a.exp_per_hour, b.exp_per_hour)),
        SortKey::FertilizedExp => results.sort_by(|a, b| {
            desc(a.normal_fertilizer_exp_per_hour, b.normal_fertilizer_exp_per_hour)
        }),
        SortKey::Gold => results.sort_by(|a, b| desc(a.gold_per_hour, b.gold_per_hour)),
        SortKey::Profit => results.sort_by(|a, b| desc(a.profit_per_hour, b.profit_per_hour)),
        SortKey::FertilizedProfit => results.sort_by(|a, b| {
            desc(
                a.normal_fertilizer_profit_per_hour,
                b.normal_fertilizer_profit_per_hour,
            )
        }),
        // Unknown level sorts last
        SortKey::Level => {
            results.sort_by(|a, b| b.level.unwrap_or(-1).cmp(&a.level.unwrap_or(-1)))
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> PlantCatalog {
        serde_json::from_value(json!({
            "plants": [
                {
                    "id": 1020001, "name": "Turnip", "seed_id": 20001,
                    "grow_phases": "seed:60;sprout:60;ripe:0;", "exp": 10,
                    "fruit": { "id": 40001, "count": 10 }, "land_level_need": 1
                },
                {
                    "id": 1020002, "name": "Pumpkin", "seed_id": 20002,
                    "grow_phases": "seed:1800;sprout:1800;", "exp": 200,
                    "fruit": { "id": 40002, "count": 20 }
                },
                {
                    "id": 1030001, "name": "Rose", "seed_id": 20003,
                    "grow_phases": "seed:60;", "exp": 999
                },
                {
                    "id": 1020003, "name": "Event Bean", "seed_id": 30001,
                    "grow_phases": "seed:60;", "exp": 999
                },
                {
                    "id": 1020004, "name": "Broken", "seed_id": 20004,
                    "grow_phases": "", "exp": 1
                }
            ],
            "fruit_prices": { "40001": 5, "40002": 30 },
            "seed_prices": { "20001": 20, "20002": 300 }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_grow_time_sums_suffixes() {
        assert_eq!(parse_grow_time("a:10;b:20;c:0;"), 30);
        assert_eq!(parse_grow_time("a:10;junk;b:x5"), 10);
        assert_eq!(parse_grow_time(""), 0);
    }

    #[test]
    fn test_extreme_catalog_values_saturate() {
        assert_eq!(parse_grow_time("a:9223372036854775807;b:10;"), i64::MAX);

        let catalog: PlantCatalog = serde_json::from_value(json!({
            "plants": [{
                "id": 1020009, "name": "Giant", "seed_id": 20009,
                "grow_phases": "seed:60;", "exp": 1,
                "fruit": { "id": 40009, "count": i64::MAX }
            }],
            "fruit_prices": { "40009": 3 },
            "seed_prices": { "20009": -5 }
        }))
        .unwrap();

        let giant = &plant_rankings(&catalog, SortKey::Profit)[0];
        assert_eq!(giant.income, i64::MAX);
        assert_eq!(giant.net_profit, i64::MAX);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(125), "2m5s");
        assert_eq!(format_duration(3600), "1h");
        assert_eq!(format_duration(5400), "1h30m");
    }

    #[test]
    fn test_fertilizer_speedup_rule() {
        // 20 % of 120 s is under 30 s, so a flat 30 s is saved
        assert_eq!(fertilized_grow_time(120), 90.0);
        assert_eq!(fertilized_grow_time(3600), 2880.0);
        assert_eq!(fertilized_grow_time(20), 1.0);
    }

    #[test]
    fn test_only_normal_crops_are_ranked() {
        let rankings = plant_rankings(&catalog(), SortKey::Exp);
        let names: Vec<_> = rankings.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Turnip", "Pumpkin"]);
    }

    #[test]
    fn test_ranking_figures() {
        let rankings = plant_rankings(&catalog(), SortKey::Gold);
        let turnip = rankings.iter().find(|r| r.name == "Turnip").unwrap();

        assert_eq!(turnip.grow_time, 120);
        assert_eq!(turnip.grow_time_str, "2m0s");
        assert_eq!(turnip.exp_per_hour, 300.0);
        assert_eq!(turnip.normal_fertilizer_exp_per_hour, 400.0);
        assert_eq!(turnip.income, 50);
        assert_eq!(turnip.net_profit, 30);
        assert_eq!(turnip.gold_per_hour, 1500.0);
        assert_eq!(turnip.profit_per_hour, 900.0);
        assert_eq!(turnip.level, Some(1));

        let pumpkin = rankings.iter().find(|r| r.name == "Pumpkin").unwrap();
        assert_eq!(pumpkin.level, None);
        assert_eq!(pumpkin.gold_per_hour, 600.0);
        assert_eq!(rankings[0].name, "Turnip");
    }

    #[test]
    fn test_level_sort_puts_unknown_last() {
        let rankings = plant_rankings(&catalog(), SortKey::Level);
        assert_eq!(rankings[0].name, "Turnip");
        assert_eq!(rankings[1].level, None);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("fert_profit".parse::<SortKey>().unwrap(), SortKey::FertilizedProfit);
        assert!("speed".parse::<SortKey>().is_err());
    }
}
