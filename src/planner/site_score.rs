//! Phase B: how good is this field for this building type?
//!
//! Each function returns `None` when the pair is unusable and otherwise a
//! signed score; the planner keeps the maximum.

use crate::core::config::PlannerConfig;
use crate::core::types::BuildSize;
use crate::planner::military_bounds::MilitaryScoreBounds;
use crate::planner::profile::{BuildingCatalog, BuildingTypeProfile, Capability, Role};
use crate::scoring::{Feature, ScoringFunction};
use crate::survey::{BuildableField, MineableField};

/// Shared inputs of one scoring pass
pub struct SiteContext<'a> {
    pub catalog: &'a BuildingCatalog,
    pub scoring: &'a dyn ScoringFunction,
    pub config: &'a PlannerConfig,
    /// Few big spots left; keep them for big buildings
    pub big_spots_scarce: bool,
}

/// Count of the natural resource the type works on, if it needs one
fn worked_resource(profile: &BuildingTypeProfile, field: &BuildableField) -> Option<u32> {
    if profile.has(Capability::Lumberjack) || profile.has(Capability::Hunter) {
        Some(field.trees_nearby)
    } else if profile.has(Capability::Quarry) {
        Some(field.rocks_nearby)
    } else if profile.has(Capability::Fisher) {
        Some(field.water_nearby)
    } else {
        None
    }
}

/// Own sites nearby that feed this type or that this type feeds
fn supporters_nearby(
    profile: &BuildingTypeProfile,
    field: &BuildableField,
    catalog: &BuildingCatalog,
) -> u32 {
    if profile.has(Capability::Lumberjack) {
        return field.rangers_nearby;
    }
    field
        .buildings_nearby
        .iter()
        .filter_map(|(id, count)| catalog.get(*id).map(|other| (other, u32::from(*count))))
        .filter(|(other, _)| {
            let ranger_for_lumber =
                profile.has(Capability::Ranger) && other.has(Capability::Lumberjack);
            let feeds_us = other.outputs.iter().any(|w| profile.inputs.contains(w));
            let we_feed = profile.outputs.iter().any(|w| other.inputs.contains(w));
            ranger_for_lumber || feeds_us || we_feed
        })
        .map(|(_, count)| count)
        .sum()
}

/// Penalty for a small building taking a big spot while big spots are rare
fn size_waste(profile: &BuildingTypeProfile, field: &BuildableField, ctx: &SiteContext) -> i32 {
    let wasted = ctx.big_spots_scarce && field.size == BuildSize::Big && profile.size < BuildSize::Big;
    ctx.scoring.score_if(Feature::BigFieldWaste, wasted)
}

/// Score a production site, warehouse or trainingsite on a buildable field
pub fn score_site(
    profile: &BuildingTypeProfile,
    field: &BuildableField,
    warehouse_distance: Option<u32>,
    ctx: &SiteContext,
) -> Option<i32> {
    if !field.surveyed || !field.size.fits(profile.size) {
        return None;
    }
    let scoring = ctx.scoring;
    let mut score = profile.primary_priority;

    if let Some(amount) = worked_resource(profile, field) {
        if amount == 0 {
            return None;
        }
        score = score.saturating_add(scoring.score(Feature::ResourceProximity, amount as i32));
    }
    if profile.has(Capability::NeedsWater) && field.water_nearby == 0 {
        return None;
    }

    let supporters = supporters_nearby(profile, field, ctx.catalog);
    score = score.saturating_add(scoring.score(Feature::SupporterProximity, supporters as i32));

    let same_type = field.nearby_of_type(profile.id);
    if same_type > ctx.config.density_threshold {
        let excess = (same_type - ctx.config.density_threshold) as i32;
        score = score.saturating_add(scoring.score(Feature::SameTypeCrowding, excess));
    }

    if profile.has(Capability::SpaceConsumer) {
        // Farms need open land around them
        if field.open_land_nearby < 6 {
            return None;
        }
        score = score.saturating_add(
            scoring.score(Feature::SpaceConsumerCrowding, field.space_consumers_nearby as i32),
        );
    }
    if profile.has(Capability::Ranger) {
        score = score.saturating_add(scoring.score(Feature::RangerSpace, field.open_land_nearby as i32));
        // Rangers next to each other plant over the same land
        score = score.saturating_add(
            scoring.score(Feature::SameTypeCrowding, field.rangers_nearby as i32),
        );
    }

    if field.near_border {
        score /= 2;
        score = score.saturating_add(scoring.score_if(Feature::BorderPenalty, true));
    }
    if field.enemy_land > 0 || field.enemy_military_sites > 0 {
        score = score.saturating_add(scoring.score_if(Feature::EnemyProximityPenalty, true));
    }

    score = score.saturating_add(scoring.score_if(Feature::RoadBonus, field.road_nearby));
    score = score.saturating_add(size_waste(profile, field, ctx));

    if let Some(distance) = warehouse_distance {
        let contribution = scoring.score(Feature::WarehouseDistance, distance as i32);
        // Warehouses want to be far from the existing ones
        score = if matches!(profile.role, Role::Warehouse { .. }) {
            score.saturating_sub(contribution)
        } else {
            score.saturating_add(contribution)
        };
    }

    Some(score)
}

/// Score a military site against the adaptive floor
pub fn score_military_site(
    profile: &BuildingTypeProfile,
    field: &BuildableField,
    bounds: &MilitaryScoreBounds,
    ctx: &SiteContext,
) -> Option<i32> {
    let Role::Military { conquers } = profile.role else {
        return None;
    };
    if !field.surveyed || !field.size.fits(profile.size) || !bounds.accepts(field.military_score)
    {
        return None;
    }
    let mut score = field.military_score - bounds.least();
    // Facing the enemy, the bigger the better
    if field.enemy_military_sites > 0 || field.enemy_land > 0 {
        score = score.saturating_add(conquers as i32);
    } else if profile.size > BuildSize::Small {
        score = score.saturating_sub(conquers as i32 / 2);
    }
    score = score.saturating_add(profile.primary_priority);
    score = score.saturating_add(size_waste(profile, field, ctx));
    Some(score)
}

/// Score a mine on a mineable spot
pub fn score_mine(
    profile: &BuildingTypeProfile,
    spot: &MineableField,
    ctx: &SiteContext,
) -> Option<i32> {
    let resource = profile.mined_resource()?;
    if !spot.surveyed || spot.resource != Some(resource) || spot.amount == 0 {
        return None;
    }
    let scoring = ctx.scoring;
    let mut score = profile.primary_priority;
    score = score.saturating_add(scoring.score(Feature::ResourceProximity, spot.amount as i32 / 4));
    score = score.saturating_add(scoring.score(Feature::SameTypeCrowding, spot.mines_nearby as i32));
    score = score.saturating_add(scoring.score_if(Feature::RoadBonus, spot.road_nearby));
    score = score.saturating_add(scoring.score_if(Feature::BorderPenalty, spot.near_border));
    Some(score)
}
