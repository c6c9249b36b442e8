use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use crate::error::{ConfigError, GachaError};
use crate::gacha::{
    must_force, record_outcome, Banner, Guarantee, PityState, PullResult, PullSize, Rarity, RewardItem,
};

/// A single draw and the pity state it leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    pub result: PullResult,
    pub pity: PityState,
}

/// Results of a whole request, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub results: Vec<PullResult>,
    pub pity: PityState,
}

/// Draws rewards from one banner. Holds no state of its own; pity and the
/// owned-item set are threaded through by the caller.
pub struct Sampler<'a> {
    banner: &'a Banner,
}

impl<'a> Sampler<'a> {
    pub fn new(banner: &'a Banner) -> Self {
        Self { banner }
    }

    /// Weighted roll over the rate table. Cumulative weights are walked in
    /// `Rarity::SAMPLING_ORDER` (legendary first).
    pub fn draw_rarity<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Rarity, GachaError> {
        let rates = &self.banner.rates;
        let total = rates.total_weight();
        if total == 0 {
            return Err(ConfigError::ZeroTotalWeight { pool: self.banner.id.clone() }.into());
        }

        let mut roll = rng.random_range(0..total);
        for rarity in Rarity::SAMPLING_ORDER {
            let weight = rates.weight(rarity) as u64;
            if roll < weight {
                return Ok(rarity);
            }
            roll -= weight;
        }
        Err(ConfigError::ZeroTotalWeight { pool: self.banner.id.clone() }.into())
    }

    /// Uniform pick inside one tier. An empty tier is an error, never a
    /// downgrade.
    pub fn pick_item<R: Rng + ?Sized>(&self, rarity: Rarity, rng: &mut R) -> Result<&'a RewardItem, GachaError> {
        let tier = self.banner.tier(rarity);
        if tier.is_empty() {
            return Err(GachaError::EmptyPool { pool: self.banner.id.clone(), rarity });
        }
        Ok(tier[rng.random_range(0..tier.len())])
    }

    /// One draw. Pity forcing comes first; otherwise the weighted roll is
    /// lifted to `floor` when it lands below it. `owned` gains the drawn
    /// item so later draws in the same batch see it as owned.
    pub fn sample_one<R: Rng + ?Sized>(
        &self,
        slot: usize,
        pity: PityState,
        floor: Option<Rarity>,
        owned: &mut HashSet<String>,
        rng: &mut R,
    ) -> Result<Draw, GachaError> {
        let (rarity, guarantee) = match must_force(&pity, &self.banner.rates) {
            Some(forced) => {
                debug!(
                    "[Sampler::sample_one] pool {} slot {} forced {} (epic {}, legendary {})",
                    self.banner.id, slot, forced, pity.pulls_since_epic, pity.pulls_since_legendary
                );
                let guarantee = match forced {
                    Rarity::Legendary => Guarantee::LegendaryPity,
                    _ => Guarantee::EpicPity,
                };
                (forced, Some(guarantee))
            }
            None => {
                let rolled = self.draw_rarity(rng)?;
                match floor {
                    Some(floor) if rolled < floor => (floor, Some(Guarantee::TenPullFloor)),
                    _ => (rolled, None),
                }
            }
        };

        let item = self.pick_item(rarity, rng)?;
        let is_new = owned.insert(item.id().to_string());

        Ok(Draw {
            result: PullResult {
                slot,
                item_id: item.id().to_string(),
                item_type: item.kind(),
                name: item.name().to_string(),
                rarity,
                is_new,
                guarantee,
            },
            pity: record_outcome(pity, rarity),
        })
    }

    /// Draws a full request. Each draw sees the pity left by the one before
    /// it. In a ten-pull the final slot is floored at rare when none of the
    /// first nine reached rare.
    pub fn sample_batch<R: Rng + ?Sized>(
        &self,
        pull_size: PullSize,
        pity: PityState,
        owned: &HashSet<String>,
        rng: &mut R,
    ) -> Result<Batch, GachaError> {
        let count = pull_size.count();
        let mut owned = owned.clone();
        let mut pity = pity;
        let mut results = Vec::with_capacity(count);

        for slot in 0..count {
            let floor = if pull_size == PullSize::Ten
                && slot == count - 1
                && !results.iter().any(|r: &PullResult| r.rarity >= Rarity::Rare)
            {
                Some(Rarity::Rare)
            } else {
                None
            };

            let draw = self.sample_one(slot, pity, floor, &mut owned, rng)?;
            pity = draw.pity;
            results.push(draw.result);
        }

        Ok(Batch { results, pity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gacha::{BannerSet, HunterItem, HunterStats, ItemBase, RateTable, WeaponItem, WeaponStats};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hunter(id: &str, rarity: Rarity) -> RewardItem {
        RewardItem::Hunter(HunterItem {
            base: ItemBase { id: id.to_string(), name: id.to_string(), rarity, description: String::new() },
            stats: HunterStats::default(),
        })
    }

    fn weapon(id: &str, rarity: Rarity) -> RewardItem {
        RewardItem::Weapon(WeaponItem {
            base: ItemBase { id: id.to_string(), name: id.to_string(), rarity, description: String::new() },
            stats: WeaponStats::default(),
        })
    }

    /// Banner whose weighted roll always lands on common.
    fn all_common_banner() -> Banner {
        let mut rates = RateTable::default();
        for rarity in [Rarity::Legendary, Rarity::Epic, Rarity::Rare] {
            rates.weights.insert(rarity, 0);
        }
        Banner::new(
            "dry",
            "Dry",
            "",
            rates,
            vec![
                hunter("c1", Rarity::Common),
                weapon("c2", Rarity::Common),
                hunter("r1", Rarity::Rare),
                hunter("e1", Rarity::Epic),
                hunter("l1", Rarity::Legendary),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_weighted_roll_respects_zero_weights() {
        let banner = all_common_banner();
        let sampler = Sampler::new(&banner);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert_eq!(sampler.draw_rarity(&mut rng).unwrap(), Rarity::Common);
        }
    }

    #[test]
    fn test_weighted_roll_distribution_is_plausible() {
        let set = BannerSet::builtin().unwrap();
        let banner = set.get(None).unwrap();
        let sampler = Sampler::new(&banner);
        let mut rng = StdRng::seed_from_u64(42);

        let mut common = 0;
        let mut legendary = 0;
        let n = 20_000;
        for _ in 0..n {
            match sampler.draw_rarity(&mut rng).unwrap() {
                Rarity::Common => common += 1,
                Rarity::Legendary => legendary += 1,
                _ => {}
            }
        }
        // 74% and 1% nominal
        assert!((13_800..15_800).contains(&common), "common = {}", common);
        assert!((100..350).contains(&legendary), "legendary = {}", legendary);
    }

    #[test]
    fn test_forced_legendary_resets_counters() {
        let banner = all_common_banner();
        let sampler = Sampler::new(&banner);
        let mut rng = StdRng::seed_from_u64(1);
        let mut owned = HashSet::new();

        let pity = PityState { pulls_since_epic: 3, pulls_since_legendary: 99 };
        let draw = sampler.sample_one(0, pity, None, &mut owned, &mut rng).unwrap();
        assert_eq!(draw.result.rarity, Rarity::Legendary);
        assert_eq!(draw.result.item_id, "l1");
        assert_eq!(draw.result.guarantee, Some(Guarantee::LegendaryPity));
        assert_eq!(draw.pity, PityState::default());
    }

    #[test]
    fn test_forced_epic() {
        let banner = all_common_banner();
        let sampler = Sampler::new(&banner);
        let mut rng = StdRng::seed_from_u64(1);
        let mut owned = HashSet::new();

        let pity = PityState { pulls_since_epic: 19, pulls_since_legendary: 40 };
        let draw = sampler.sample_one(0, pity, None, &mut owned, &mut rng).unwrap();
        assert_eq!(draw.result.rarity, Rarity::Epic);
        assert_eq!(draw.result.guarantee, Some(Guarantee::EpicPity));
        assert_eq!(draw.pity, PityState { pulls_since_epic: 0, pulls_since_legendary: 41 });
    }

    #[test]
    fn test_ten_pull_of_commons_lifts_last_slot() {
        let banner = all_common_banner();
        let sampler = Sampler::new(&banner);
        let mut rng = StdRng::seed_from_u64(3);

        let batch = sampler
            .sample_batch(PullSize::Ten, PityState::default(), &HashSet::new(), &mut rng)
            .unwrap();
        assert_eq!(batch.results.len(), 10);
        for result in &batch.results[..9] {
            assert_eq!(result.rarity, Rarity::Common);
        }
        assert_eq!(batch.results[9].rarity, Rarity::Rare);
        assert_eq!(batch.results[9].guarantee, Some(Guarantee::TenPullFloor));
        assert_eq!(batch.results[9].item_id, "r1");
        assert_eq!(batch.pity, PityState { pulls_since_epic: 10, pulls_since_legendary: 10 });
        let slots: Vec<usize> = batch.results.iter().map(|r| r.slot).collect();
        assert_eq!(slots, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_ten_pull_pity_carries_between_slots() {
        let banner = all_common_banner();
        let sampler = Sampler::new(&banner);
        let mut rng = StdRng::seed_from_u64(9);

        // 95 dry pulls: the fifth slot is the hundredth pull
        let pity = PityState { pulls_since_epic: 5, pulls_since_legendary: 95 };
        let batch = sampler.sample_batch(PullSize::Ten, pity, &HashSet::new(), &mut rng).unwrap();
        let legendary_slots: Vec<usize> = batch
            .results
            .iter()
            .filter(|r| r.rarity == Rarity::Legendary)
            .map(|r| r.slot)
            .collect();
        assert_eq!(legendary_slots, vec![4]);
        // the legendary already satisfies the rare-or-better guarantee
        assert!(batch.results.iter().all(|r| r.guarantee != Some(Guarantee::TenPullFloor)));
        assert_eq!(batch.pity, PityState { pulls_since_epic: 5, pulls_since_legendary: 5 });
    }

    #[test]
    fn test_ten_pull_always_has_rare_or_better() {
        let set = BannerSet::builtin().unwrap();
        let banner = set.get(None).unwrap();
        let sampler = Sampler::new(&banner);
        let mut rng = StdRng::seed_from_u64(2024);
        let mut pity = PityState::default();
        for _ in 0..300 {
            let batch = sampler.sample_batch(PullSize::Ten, pity, &HashSet::new(), &mut rng).unwrap();
            assert!(batch.results.iter().any(|r| r.rarity >= Rarity::Rare));
            pity = batch.pity;
        }
    }

    #[test]
    fn test_is_new_tracks_batch_and_inventory() {
        let mut rates = RateTable::default();
        for rarity in [Rarity::Legendary, Rarity::Epic, Rarity::Rare] {
            rates.weights.insert(rarity, 0);
        }
        let banner = Banner::new(
            "one",
            "One",
            "",
            rates,
            vec![
                hunter("only_common", Rarity::Common),
                hunter("r", Rarity::Rare),
                hunter("e", Rarity::Epic),
                hunter("l", Rarity::Legendary),
            ],
        )
        .unwrap();
        let sampler = Sampler::new(&banner);
        let mut rng = StdRng::seed_from_u64(5);

        let batch = sampler
            .sample_batch(PullSize::Ten, PityState::default(), &HashSet::new(), &mut rng)
            .unwrap();
        assert!(batch.results[0].is_new);
        assert!(batch.results[1..9].iter().all(|r| !r.is_new));
        assert!(batch.results[9].is_new);

        let owned: HashSet<String> = ["only_common".to_string()].into_iter().collect();
        let batch = sampler.sample_batch(PullSize::Single, PityState::default(), &owned, &mut rng).unwrap();
        assert!(!batch.results[0].is_new);
    }

    #[test]
    fn test_empty_tier_never_downgrades() {
        let mut rates = RateTable::default();
        rates.weights.insert(Rarity::Common, 0);
        rates.weights.insert(Rarity::Rare, 0);
        rates.weights.insert(Rarity::Legendary, 0);
        // epic has weight but no items: skip validation to reach the sampler
        let banner = Banner::from_parts(
            "broken",
            "Broken",
            "",
            rates,
            vec![hunter("c", Rarity::Common), hunter("r", Rarity::Rare), hunter("l", Rarity::Legendary)],
        );
        let sampler = Sampler::new(&banner);
        let mut rng = StdRng::seed_from_u64(11);
        let err = sampler
            .sample_batch(PullSize::Single, PityState::default(), &HashSet::new(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, GachaError::EmptyPool { rarity: Rarity::Epic, .. }));
    }
}
