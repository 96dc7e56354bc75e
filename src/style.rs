//! Render styles of the used highway and area classes.

use crate::format::Rgba;
use crate::tags::Tag;

/// Appearance of a line feature before bridge/tunnel adjustments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub width: f32,
    /// Base height offset. Larger roads are drawn above smaller ones.
    pub height: f32,
    pub outline: Rgba,
    pub fill: Rgba,
}

const fn style(width: f32, height: f32, outline: Rgba, fill: Rgba) -> LineStyle {
    LineStyle {
        width,
        height,
        outline,
        fill,
    }
}

const OUTLINE: Rgba = [120, 120, 120, 255];
const NO_OUTLINE: Rgba = [0, 0, 0, 0];
const LIGHT_GREY: Rgba = [220, 220, 220, 255];
const WHITE: Rgba = [255, 255, 255, 255];
const GREY: Rgba = [160, 160, 160, 255];

/// Style of a used highway class, `None` for any other tag.
pub fn line_style(tag: Tag) -> Option<LineStyle> {
    use Tag::*;
    let style = match tag {
        HighwayMotorway => style(20.0, 0.9, OUTLINE, LIGHT_GREY),
        HighwayMotorwayLink => style(12.0, 0.85, OUTLINE, LIGHT_GREY),
        HighwayTrunk => style(18.0, 0.8, OUTLINE, [246, 250, 187, 255]),
        HighwayTrunkLink => style(12.0, 0.75, OUTLINE, [246, 250, 187, 255]),
        HighwayPrimary => style(16.0, 0.7, OUTLINE, [252, 214, 164, 255]),
        HighwayPrimaryLink => style(10.0, 0.65, OUTLINE, [252, 214, 164, 255]),
        HighwaySecondary => style(14.0, 0.6, OUTLINE, [247, 250, 191, 255]),
        HighwaySecondaryLink => style(10.0, 0.55, OUTLINE, [247, 250, 191, 255]),
        HighwayTertiary => style(12.0, 0.5, OUTLINE, WHITE),
        HighwayUnclassified | HighwayRoad => style(10.0, 0.45, OUTLINE, WHITE),
        HighwayResidential => style(10.0, 0.4, OUTLINE, WHITE),
        HighwayLivingStreet => style(8.0, 0.35, OUTLINE, [237, 237, 237, 255]),
        HighwayService | HighwayServices => style(7.0, 0.3, OUTLINE, WHITE),
        HighwayTrack => style(6.0, 0.25, NO_OUTLINE, [153, 102, 51, 255]),
        HighwayPedestrian => style(8.0, 0.2, OUTLINE, [221, 221, 233, 255]),
        HighwayPath | HighwayBridleway => style(5.0, 0.1, NO_OUTLINE, [130, 130, 130, 255]),
        HighwayCycleway => style(6.0, 0.15, NO_OUTLINE, [80, 80, 255, 255]),
        HighwayFootway => style(6.0, 0.1, NO_OUTLINE, GREY),
        HighwayByway => style(6.0, 0.1, NO_OUTLINE, GREY),
        HighwaySteps => style(5.0, 0.05, NO_OUTLINE, [250, 128, 114, 255]),
        _ => return None,
    };
    Some(style)
}

/// Fill color of a used area class, `None` for any other tag.
pub fn polygon_color(tag: Tag) -> Option<Rgba> {
    use Tag::*;
    let rgba = match tag {
        NaturalWater | NaturalBay | LanduseBasin | LanduseReservoir | LanduseSaltPond => {
            [153, 179, 204, 255]
        }
        NaturalWood | LanduseForest => [173, 209, 158, 255],
        LanduseGrass | LanduseMeadow | LanduseVillageGreen | LanduseRecreationGround
        | LanduseGreenfield => [205, 235, 176, 255],
        LanduseAllotments | LanduseOrchard | LanduseVineyard => [200, 215, 171, 255],
        LanduseFarm | LanduseFarmland => [238, 240, 213, 255],
        LanduseFarmyard | LanduseGreenhouseHorticulture => [234, 204, 164, 255],
        LanduseCemetery => [170, 203, 175, 255],
        LanduseResidential => [224, 223, 223, 255],
        LanduseCommercial => [242, 218, 217, 255],
        LanduseRetail => [255, 214, 209, 255],
        LanduseIndustrial | LanduseRailway | LanduseGarages => [235, 219, 232, 255],
        LanduseConstruction | LanduseBrownfield | LanduseLandfill | LanduseQuarry => {
            [199, 199, 180, 255]
        }
        LanduseMilitary => [243, 227, 221, 255],
        NaturalBeach | NaturalSand => [255, 241, 186, 255],
        NaturalGlacier => [221, 236, 236, 255],
        NaturalHeath | NaturalFell => [214, 217, 159, 255],
        NaturalScrub => [200, 215, 171, 255],
        NaturalWetland | NaturalMarsh | NaturalMud => [190, 210, 200, 255],
        NaturalScree => [237, 228, 220, 255],
        NaturalLand => [242, 239, 233, 255],
        BuildingYes => [217, 208, 201, 255],
        _ => return None,
    };
    Some(rgba)
}
