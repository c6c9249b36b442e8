use serde::{Deserialize, Serialize};

use crate::gacha::Rarity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Hunter,
    Weapon,
}

/// Fields every reward shares regardless of kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBase {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HunterStats {
    pub attack: i64,
    pub defense: i64,
    pub health: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub attack_bonus: i64,
    #[serde(default)]
    pub health_bonus: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HunterItem {
    #[serde(flatten)]
    pub base: ItemBase,
    pub stats: HunterStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponItem {
    #[serde(flatten)]
    pub base: ItemBase,
    pub stats: WeaponStats,
}

/// A drawable reward. Serialized with a `type` tag:
/// `{"type": "hunter", "id": "...", "name": "...", "rarity": "epic", "stats": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RewardItem {
    Hunter(HunterItem),
    Weapon(WeaponItem),
}

impl RewardItem {
    pub fn base(&self) -> &ItemBase {
        match self {
            RewardItem::Hunter(hunter) => &hunter.base,
            RewardItem::Weapon(weapon) => &weapon.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn rarity(&self) -> Rarity {
        self.base().rarity
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            RewardItem::Hunter(_) => ItemKind::Hunter,
            RewardItem::Weapon(_) => ItemKind::Weapon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json_shape() {
        let raw = r#"{
            "type": "hunter",
            "id": "sung_jinwoo",
            "name": "Sung Jin-Woo",
            "rarity": "legendary",
            "stats": {"attack": 100, "defense": 80, "health": 200}
        }"#;
        let item: RewardItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.kind(), ItemKind::Hunter);
        assert_eq!(item.id(), "sung_jinwoo");
        assert_eq!(item.rarity(), Rarity::Legendary);
        assert_eq!(item.base().description, "");

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "hunter");
        assert_eq!(value["stats"]["health"], 200);
    }

    #[test]
    fn test_weapon_health_bonus_defaults() {
        let raw = r#"{
            "type": "weapon",
            "id": "iron_sword",
            "name": "Iron Sword",
            "rarity": "common",
            "stats": {"attack_bonus": 10}
        }"#;
        let item: RewardItem = serde_json::from_str(raw).unwrap();
        match item {
            RewardItem::Weapon(weapon) => assert_eq!(weapon.stats, WeaponStats { attack_bonus: 10, health_bonus: 0 }),
            other => panic!("expected a weapon, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let raw = r#"{"type": "armor", "id": "a", "name": "A", "rarity": "epic", "stats": {}}"#;
        assert!(serde_json::from_str::<RewardItem>(raw).is_err());
    }
}
