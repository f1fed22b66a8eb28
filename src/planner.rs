use std::sync::Arc;

use parking_lot::Mutex;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use thiserror::Error;
use tracing::info;

use crate::{
    budget,
    catalog::Catalog,
    models::{EnrichedPlan, GenerateRequest, PlanTemplate, PlannedSlot, Purpose, Restaurant, RouteInfo, Tag, Weather},
};

pub const BASE_SCORE: f64 = 5.0;
pub const TAG_MATCH_BONUS: f64 = 0.5;
pub const PURPOSE_BONUS: f64 = 1.0;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no restaurant available for slot {slot} of template {template}")]
    NoRestaurant { template: String, slot: String },
}

/// Templates chosen for a request.
#[derive(Debug)]
pub struct Selection<'a> {
    pub templates: Vec<&'a PlanTemplate>,
    /// True when nothing matched and the whole catalog was used instead.
    pub fell_back: bool,
}

fn matches(template: &PlanTemplate, req: &GenerateRequest) -> bool {
    if let Some(duration) = req.duration {
        if template.duration != duration {
            return false;
        }
    }
    req.tags.is_empty() || req.tags.iter().any(|t| template.has_tag(*t))
}

/// Applies the duration and tag filters; an empty result falls back to every template.
pub fn filter_templates<'a>(templates: &'a [PlanTemplate], req: &GenerateRequest) -> Selection<'a> {
    let matched: Vec<_> = templates.iter().filter(|t| matches(t, req)).collect();
    if matched.is_empty() {
        Selection { templates: templates.iter().collect(), fell_back: true }
    } else {
        Selection { templates: matched, fell_back: false }
    }
}

fn purpose_bonus(template: &PlanTemplate, purpose: Option<Purpose>) -> f64 {
    let wanted: &[Tag] = match purpose {
        Some(Purpose::First) => &[Tag::Cafe, Tag::Sightseeing],
        Some(Purpose::Anniversary) => &[Tag::Dining, Tag::Night],
        Some(Purpose::Special) => &[Tag::Night, Tag::Entertainment],
        _ => &[],
    };
    if wanted.iter().any(|t| template.has_tag(*t)) { PURPOSE_BONUS } else { 0.0 }
}

/// Deterministic desirability score, rounded to one decimal.
pub fn score_template(template: &PlanTemplate, req: &GenerateRequest) -> f64 {
    let overlap = req.tags.iter().filter(|t| template.has_tag(**t)).count();
    let score = BASE_SCORE + overlap as f64 * TAG_MATCH_BONUS + purpose_bonus(template, req.purpose);
    (score * 10.0).round() / 10.0
}

/// Copies the timeline, attaching a uniformly drawn restaurant to every flagged slot.
/// Draws are independent, so one plan may repeat a restaurant.
pub fn recommend_restaurants<R: Rng + ?Sized>(
    template: &PlanTemplate,
    restaurants: &[Restaurant],
    rng: &mut R,
) -> Result<Vec<PlannedSlot>, PlanError> {
    template
        .timeline
        .iter()
        .map(|item| {
            let recommended_restaurant = if item.needs_restaurant {
                let pick = restaurants.choose(&mut *rng).ok_or_else(|| PlanError::NoRestaurant {
                    template: template.id.clone(),
                    slot: item.time.to_string(),
                })?;
                Some(pick.clone())
            } else {
                None
            };
            Ok(PlannedSlot { item: item.clone(), recommended_restaurant })
        })
        .collect()
}

pub struct PlanGenerator {
    catalog: Arc<Catalog>,
    rng: Mutex<StdRng>,
}

impl PlanGenerator {
    pub fn new(catalog: Arc<Catalog>, rng: StdRng) -> Self {
        Self { catalog, rng: Mutex::new(rng) }
    }

    /// Seeded from `seed` when given, otherwise from OS entropy.
    pub fn with_seed(catalog: Arc<Catalog>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self::new(catalog, rng)
    }

    pub fn catalog(&self) -> &Catalog { &self.catalog }

    fn enrich<R: Rng + ?Sized>(&self, template: &PlanTemplate, req: &GenerateRequest, rng: &mut R) -> Result<EnrichedPlan, PlanError> {
        let timeline = recommend_restaurants(template, self.catalog.restaurants(), rng)?;
        let estimated_budget = budget::estimate(timeline.iter().map(|s| &s.item));
        Ok(EnrichedPlan {
            id: template.id.clone(),
            name: template.name.clone(),
            description: template.description.clone(),
            duration: template.duration,
            tags: template.tags.clone(),
            areas: template.areas.clone(),
            timeline,
            score: score_template(template, req),
            weather: Weather::placeholder(),
            route_info: RouteInfo::placeholder(),
            estimated_budget,
            main_area: self.catalog.main_area(template).name.clone(),
        })
    }

    /// Filters, scores and enriches templates, best score first.
    pub fn generate(&self, req: &GenerateRequest) -> Result<Vec<EnrichedPlan>, PlanError> {
        let selection = filter_templates(self.catalog.templates(), req);
        if selection.fell_back {
            info!("🔁 No template matched duration={:?} tags={:?}, using full catalog", req.duration, req.tags);
        }

        // shared rng only hands out a per-request seed; enrichment runs unlocked
        let seed: u64 = self.rng.lock().gen();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut plans = selection
            .templates
            .iter()
            .map(|t| self.enrich(t, req, &mut rng))
            .collect::<Result<Vec<_>, _>>()?;
        plans.sort_by(|a, b| b.score.total_cmp(&a.score));

        info!("✅ Generated {} plans (top: {})", plans.len(), plans.first().map(|p| p.id.as_str()).unwrap_or("-"));
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Duration, SlotTime, TimelineItem};
    use pretty_assertions::assert_eq;

    fn flagged(timeline: &[TimelineItem]) -> usize { timeline.iter().filter(|i| i.needs_restaurant).count() }

    fn catalog() -> Arc<Catalog> { Arc::new(Catalog::builtin().unwrap()) }

    fn generator(seed: u64) -> PlanGenerator { PlanGenerator::new(catalog(), StdRng::seed_from_u64(seed)) }

    fn req(duration: Option<Duration>, tags: &[Tag], purpose: Option<Purpose>) -> GenerateRequest {
        GenerateRequest { duration, tags: tags.to_vec(), purpose }
    }

    fn ids(plans: &[EnrichedPlan]) -> Vec<&str> { plans.iter().map(|p| p.id.as_str()).collect() }

    #[test]
    fn no_filters_selects_whole_catalog() {
        let c = catalog();
        let sel = filter_templates(c.templates(), &GenerateRequest::default());
        assert_eq!(sel.templates.len(), c.templates().len());
        assert!(!sel.fell_back);

        let plans = generator(1).generate(&req(None, &[], Some(Purpose::Casual))).unwrap();
        assert_eq!(plans.len(), 5);
        assert!(plans.iter().all(|p| p.score == BASE_SCORE));
    }

    #[test]
    fn empty_match_falls_back_to_whole_catalog() {
        let c = catalog();
        let r = req(Some(Duration::Overnight), &[Tag::Night], None);
        let sel = filter_templates(c.templates(), &r);
        assert!(sel.fell_back);
        assert_eq!(sel.templates.len(), 5);

        let r = req(Some(Duration::Unknown), &[Tag::Dining], None);
        assert!(filter_templates(c.templates(), &r).fell_back);
        assert_eq!(generator(2).generate(&r).unwrap().len(), 5);
    }

    #[test]
    fn half_day_dining_sightseeing_casual() {
        let plans = generator(3)
            .generate(&req(Some(Duration::Half), &[Tag::Dining, Tag::Sightseeing], Some(Purpose::Casual)))
            .unwrap();
        // shibuya_trendy is half-day but shares no tag with dining/sightseeing
        let mut got: Vec<(&str, f64)> = plans.iter().map(|p| (p.id.as_str(), p.score)).collect();
        got[1..].sort_by(|a, b| a.0.cmp(b.0));
        assert_eq!(got, vec![("yokohama_romantic", 6.0), ("ginza_luxury", 5.5), ("odaiba_night", 5.5)]);
    }

    #[test]
    fn full_day_anniversary_scores_base_only() {
        let plans = generator(4).generate(&req(Some(Duration::Full), &[], Some(Purpose::Anniversary))).unwrap();
        assert_eq!(ids(&plans), vec!["kamakura_retro"]);
        assert_eq!(plans[0].score, 5.0);
        assert_eq!(plans[0].main_area, "鎌倉");
    }

    #[test]
    fn purpose_bonus_applies_once() {
        let c = catalog();
        let by_id = |id: &str| c.templates().iter().find(|t| t.id == id).unwrap().clone();
        let odaiba = by_id("odaiba_night");
        let kamakura = by_id("kamakura_retro");

        // odaiba has both night and entertainment, still only +1
        assert_eq!(score_template(&odaiba, &req(None, &[], Some(Purpose::Special))), 6.0);
        assert_eq!(score_template(&odaiba, &req(None, &[], Some(Purpose::Anniversary))), 6.0);
        assert_eq!(score_template(&odaiba, &req(None, &[], Some(Purpose::First))), 5.0);
        assert_eq!(score_template(&kamakura, &req(None, &[], Some(Purpose::First))), 6.0);
        for p in [Purpose::Casual, Purpose::Proposal, Purpose::Other] {
            assert_eq!(score_template(&kamakura, &req(None, &[], Some(p))), 5.0);
        }
    }

    #[test]
    fn tag_bonus_is_proportional_to_overlap() {
        let c = catalog();
        let yokohama = &c.templates()[0];
        let all = [Tag::Shopping, Tag::Dining, Tag::Sightseeing, Tag::Night, Tag::Unknown];
        assert_eq!(score_template(yokohama, &req(None, &all, Some(Purpose::First))), 7.5);
    }

    #[test]
    fn scores_are_deterministic_and_one_decimal() {
        let c = catalog();
        let r = req(None, &[Tag::Cafe, Tag::Night, Tag::Dining], Some(Purpose::Special));
        for t in c.templates() {
            let s = score_template(t, &r);
            assert_eq!(s, score_template(t, &r));
            assert!(s >= 0.0);
            assert_eq!((s * 10.0).round(), s * 10.0);
        }
    }

    #[test]
    fn plans_sorted_by_score_descending() {
        let plans = generator(5)
            .generate(&req(None, &[Tag::Night], Some(Purpose::Special)))
            .unwrap();
        assert!(plans.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(plans[0].id, "odaiba_night");
    }

    #[test]
    fn restaurants_attach_to_flagged_slots_only() {
        let c = catalog();
        let plans = generator(6).generate(&GenerateRequest::default()).unwrap();
        for plan in &plans {
            let template = c.templates().iter().find(|t| t.id == plan.id).unwrap();
            assert_eq!(plan.timeline.len(), template.timeline.len());
            for slot in &plan.timeline {
                assert_eq!(slot.item.needs_restaurant, slot.recommended_restaurant.is_some());
            }
            let attached = plan.timeline.iter().filter(|s| s.recommended_restaurant.is_some()).count();
            assert_eq!(attached, flagged(&template.timeline));
        }
        // source templates are untouched
        assert_eq!(c.templates(), Catalog::builtin().unwrap().templates());
    }

    #[test]
    fn same_seed_same_restaurants() {
        let r = req(Some(Duration::Half), &[Tag::Cafe], None);
        let a = generator(42).generate(&r).unwrap();
        let b = generator(42).generate(&r).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn concurrent_requests_share_one_generator() {
        let gen = generator(9);
        let r = req(Some(Duration::Half), &[Tag::Night], Some(Purpose::Special));
        let results: Vec<Vec<EnrichedPlan>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| gen.generate(&r).unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for plans in &results {
            assert_eq!(ids(plans), vec!["odaiba_night"]);
            assert_eq!(plans[0].score, 6.5);
            assert!(plans[0].timeline.iter().all(|s| s.item.needs_restaurant == s.recommended_restaurant.is_some()));
        }
    }

    #[test]
    fn empty_duration_string_means_no_duration_filter() {
        let r: GenerateRequest = serde_json::from_str(r#"{"duration":"","tags":["night"]}"#).unwrap();
        assert_eq!(ids(&generator(10).generate(&r).unwrap()), vec!["odaiba_night"]);
    }

    #[test]
    fn non_string_tag_matches_nothing_and_falls_back() {
        let r: GenerateRequest = serde_json::from_str(r#"{"duration":"half","tags":[7]}"#).unwrap();
        let plans = generator(12).generate(&r).unwrap();
        assert_eq!(plans.len(), 5);
        assert!(plans.iter().all(|p| p.score == BASE_SCORE));
    }

    #[test]
    fn single_restaurant_catalog_repeats_freely() {
        let c = Catalog::builtin().unwrap();
        let only = c.restaurants()[..1].to_vec();
        let c = Catalog::new(c.areas().clone(), c.templates().to_vec(), only.clone(), "tokyo").unwrap();
        let shibuya = c.templates().iter().find(|t| t.id == "shibuya_trendy").unwrap();
        let slots = recommend_restaurants(shibuya, c.restaurants(), &mut StdRng::seed_from_u64(7)).unwrap();
        let picks: Vec<_> = slots.iter().filter_map(|s| s.recommended_restaurant.as_ref()).collect();
        assert_eq!(picks.len(), 3);
        assert!(picks.iter().all(|r| r.id == only[0].id));
    }

    #[test]
    fn no_restaurants_is_an_internal_error() {
        let c = catalog();
        let ginza = c.templates().iter().find(|t| t.id == "ginza_luxury").unwrap();
        let err = recommend_restaurants(ginza, &[], &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, PlanError::NoRestaurant { ref slot, .. } if slot == "14:45"));
    }

    #[test]
    fn budget_matches_timeline() {
        let plans = generator(8).generate(&req(Some(Duration::Half), &[Tag::Shopping], None)).unwrap();
        let yokohama = plans.iter().find(|p| p.id == "yokohama_romantic").unwrap();
        // lunch 12:45 + dinner 17:00, doubled
        assert_eq!(yokohama.estimated_budget.min, 11_000);
        assert_eq!(yokohama.estimated_budget.max, 22_000);
        assert_eq!(yokohama.estimated_budget.display, "¥11,000〜22,000");
        assert_eq!(yokohama.timeline[7].item.time, SlotTime::from_hm(17, 0));
        assert_eq!(yokohama.weather, Weather::placeholder());
        assert_eq!(yokohama.route_info, RouteInfo::placeholder());
        assert_eq!(yokohama.main_area, "横浜");
    }
}
