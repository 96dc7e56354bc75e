//! Static catalog of the OSM tags recognized by the compiler.
//!
//! Every recognized `(key, value)` pair has a dense id, the discriminant of
//! [`Tag`]. Tags that are not in the catalog are ignored during ingestion.

use ahash::AHashMap;

use std::fmt;
use std::sync::OnceLock;

macro_rules! catalog {
    ($($name:ident => ($key:literal, $value:literal),)*) => {
        /// A recognized `(key, value)` pair.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u8)]
        pub enum Tag {
            $($name,)*
        }

        /// All recognized tags in id order.
        pub const CATALOG: &[(Tag, &str, &str)] = &[
            $((Tag::$name, $key, $value),)*
        ];
    };
}

catalog! {
    HighwayMotorway => ("highway", "motorway"),
    HighwayMotorwayLink => ("highway", "motorway_link"),
    HighwayTrunk => ("highway", "trunk"),
    HighwayTrunkLink => ("highway", "trunk_link"),
    HighwayPrimary => ("highway", "primary"),
    HighwayPrimaryLink => ("highway", "primary_link"),
    HighwaySecondary => ("highway", "secondary"),
    HighwaySecondaryLink => ("highway", "secondary_link"),
    HighwayTertiary => ("highway", "tertiary"),
    HighwayUnclassified => ("highway", "unclassified"),
    HighwayRoad => ("highway", "road"),
    HighwayResidential => ("highway", "residential"),
    HighwayLivingStreet => ("highway", "living_street"),
    HighwayService => ("highway", "service"),
    HighwayTrack => ("highway", "track"),
    HighwayPedestrian => ("highway", "pedestrian"),
    HighwayRaceway => ("highway", "raceway"),
    HighwayServices => ("highway", "services"),
    HighwayBusGuideway => ("highway", "bus_guideway"),
    HighwayPath => ("highway", "path"),
    HighwayCycleway => ("highway", "cycleway"),
    HighwayFootway => ("highway", "footway"),
    HighwayBridleway => ("highway", "bridleway"),
    HighwayByway => ("highway", "byway"),
    HighwaySteps => ("highway", "steps"),
    HighwayMiniRoundabout => ("highway", "mini_roundabout"),
    HighwayStop => ("highway", "stop"),
    HighwayTrafficSignals => ("highway", "traffic_signals"),
    HighwayCrossing => ("highway", "crossing"),
    HighwayMotorwayJunction => ("highway", "motorway_junction"),
    HighwayIncline => ("highway", "incline"),
    HighwayInclineSteep => ("highway", "incline_steep"),
    HighwayFord => ("highway", "ford"),
    HighwayBusStop => ("highway", "bus_stop"),
    HighwayTurningCircle => ("highway", "turning_circle"),
    HighwayConstruction => ("highway", "construction"),
    HighwayProposed => ("highway", "proposed"),
    HighwayEmergencyAccessPoint => ("highway", "emergency_access_point"),
    HighwaySpeedCamera => ("highway", "speed_camera"),
    TrafficCalmingYes => ("traffic_calming", "yes"),
    TrafficCalmingBump => ("traffic_calming", "bump"),
    TrafficCalmingChicane => ("traffic_calming", "chicane"),
    TrafficCalmingCushion => ("traffic_calming", "cushion"),
    TrafficCalmingHump => ("traffic_calming", "hump"),
    TrafficCalmingRumbleStrip => ("traffic_calming", "rumble_strip"),
    TrafficCalmingTable => ("traffic_calming", "table"),
    TrafficCalmingChoker => ("traffic_calming", "choker"),
    SmoothnessExcellent => ("smoothness", "excellent"),
    SmoothnessGood => ("smoothness", "good"),
    SmoothnessIntermediate => ("smoothness", "intermediate"),
    SmoothnessBad => ("smoothness", "bad"),
    SmoothnessVeryBad => ("smoothness", "very_bad"),
    SmoothnessHorrible => ("smoothness", "horrible"),
    SmoothnessVeryHorrible => ("smoothness", "very_horrible"),
    SmoothnessImpassable => ("smoothness", "impassable"),
    LanduseAllotments => ("landuse", "allotments"),
    LanduseBasin => ("landuse", "basin"),
    LanduseBrownfield => ("landuse", "brownfield"),
    LanduseCemetery => ("landuse", "cemetery"),
    LanduseCommercial => ("landuse", "commercial"),
    LanduseConstruction => ("landuse", "construction"),
    LanduseFarm => ("landuse", "farm"),
    LanduseFarmland => ("landuse", "farmland"),
    LanduseFarmyard => ("landuse", "farmyard"),
    LanduseForest => ("landuse", "forest"),
    LanduseGarages => ("landuse", "garages"),
    LanduseGrass => ("landuse", "grass"),
    LanduseGreenfield => ("landuse", "greenfield"),
    LanduseGreenhouseHorticulture => ("landuse", "greenhouse_horticulture"),
    LanduseIndustrial => ("landuse", "industrial"),
    LanduseLandfill => ("landuse", "landfill"),
    LanduseMeadow => ("landuse", "meadow"),
    LanduseMilitary => ("landuse", "military"),
    LanduseOrchard => ("landuse", "orchard"),
    LanduseQuarry => ("landuse", "quarry"),
    LanduseRailway => ("landuse", "railway"),
    LanduseRecreationGround => ("landuse", "recreation_ground"),
    LanduseReservoir => ("landuse", "reservoir"),
    LanduseResidential => ("landuse", "residential"),
    LanduseRetail => ("landuse", "retail"),
    LanduseSaltPond => ("landuse", "salt_pond"),
    LanduseVillageGreen => ("landuse", "village_green"),
    LanduseVineyard => ("landuse", "vineyard"),
    NaturalBay => ("natural", "bay"),
    NaturalBeach => ("natural", "beach"),
    NaturalCaveEntrance => ("natural", "cave_entrance"),
    NaturalCliff => ("natural", "cliff"),
    NaturalCoastline => ("natural", "coastline"),
    NaturalFell => ("natural", "fell"),
    NaturalGlacier => ("natural", "glacier"),
    NaturalHeath => ("natural", "heath"),
    NaturalLand => ("natural", "land"),
    NaturalMarsh => ("natural", "marsh"),
    NaturalMud => ("natural", "mud"),
    NaturalPeak => ("natural", "peak"),
    NaturalSand => ("natural", "sand"),
    NaturalScree => ("natural", "scree"),
    NaturalScrub => ("natural", "scrub"),
    NaturalSpring => ("natural", "spring"),
    NaturalStone => ("natural", "stone"),
    NaturalTree => ("natural", "tree"),
    NaturalVolcano => ("natural", "volcano"),
    NaturalWater => ("natural", "water"),
    NaturalWetland => ("natural", "wetland"),
    NaturalWood => ("natural", "wood"),
    BridgeYes => ("bridge", "yes"),
    TunnelYes => ("tunnel", "yes"),
    LayerM5 => ("layer", "-5"),
    LayerM4 => ("layer", "-4"),
    LayerM3 => ("layer", "-3"),
    LayerM2 => ("layer", "-2"),
    LayerM1 => ("layer", "-1"),
    Layer0 => ("layer", "0"),
    Layer1 => ("layer", "1"),
    Layer2 => ("layer", "2"),
    Layer3 => ("layer", "3"),
    Layer4 => ("layer", "4"),
    Layer5 => ("layer", "5"),
    BuildingYes => ("building", "yes"),
}

/// Highway classes rendered as line features.
pub const USED_HIGHWAYS: [Tag; 23] = [
    Tag::HighwayMotorway,
    Tag::HighwayMotorwayLink,
    Tag::HighwayTrunk,
    Tag::HighwayTrunkLink,
    Tag::HighwayPrimary,
    Tag::HighwayPrimaryLink,
    Tag::HighwaySecondary,
    Tag::HighwaySecondaryLink,
    Tag::HighwayTertiary,
    Tag::HighwayUnclassified,
    Tag::HighwayRoad,
    Tag::HighwayResidential,
    Tag::HighwayLivingStreet,
    Tag::HighwayService,
    Tag::HighwayTrack,
    Tag::HighwayPedestrian,
    Tag::HighwayServices,
    Tag::HighwayPath,
    Tag::HighwayCycleway,
    Tag::HighwayFootway,
    Tag::HighwayBridleway,
    Tag::HighwayByway,
    Tag::HighwaySteps,
];

/// Area classes rendered as polygon features.
pub const USED_POLYGONS: [Tag; 43] = [
    Tag::LanduseAllotments,
    Tag::LanduseBasin,
    Tag::LanduseBrownfield,
    Tag::LanduseCemetery,
    Tag::LanduseCommercial,
    Tag::LanduseConstruction,
    Tag::LanduseFarm,
    Tag::LanduseFarmland,
    Tag::LanduseFarmyard,
    Tag::LanduseForest,
    Tag::LanduseGarages,
    Tag::LanduseGrass,
    Tag::LanduseGreenfield,
    Tag::LanduseGreenhouseHorticulture,
    Tag::LanduseIndustrial,
    Tag::LanduseLandfill,
    Tag::LanduseMeadow,
    Tag::LanduseMilitary,
    Tag::LanduseOrchard,
    Tag::LanduseQuarry,
    Tag::LanduseRailway,
    Tag::LanduseRecreationGround,
    Tag::LanduseReservoir,
    Tag::LanduseResidential,
    Tag::LanduseRetail,
    Tag::LanduseSaltPond,
    Tag::LanduseVillageGreen,
    Tag::LanduseVineyard,
    Tag::NaturalBay,
    Tag::NaturalBeach,
    Tag::NaturalFell,
    Tag::NaturalGlacier,
    Tag::NaturalHeath,
    Tag::NaturalLand,
    Tag::NaturalMarsh,
    Tag::NaturalMud,
    Tag::NaturalSand,
    Tag::NaturalScree,
    Tag::NaturalScrub,
    Tag::NaturalWater,
    Tag::NaturalWetland,
    Tag::NaturalWood,
    Tag::BuildingYes,
];

fn lookup_table() -> &'static AHashMap<(&'static str, &'static str), Tag> {
    static TABLE: OnceLock<AHashMap<(&'static str, &'static str), Tag>> = OnceLock::new();
    TABLE.get_or_init(|| {
        CATALOG
            .iter()
            .map(|&(tag, key, value)| ((key, value), tag))
            .collect()
    })
}

impl Tag {
    /// Looks up the catalog entry for `key=value`.
    pub fn lookup(key: &str, value: &str) -> Option<Tag> {
        lookup_table().get(&(key, value)).copied()
    }

    /// Dense id of the tag, its position in [`CATALOG`].
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn key(self) -> &'static str {
        CATALOG[self as usize].1
    }

    pub fn value(self) -> &'static str {
        CATALOG[self as usize].2
    }

    pub fn is_used_highway(self) -> bool {
        USED_HIGHWAYS.contains(&self)
    }

    pub fn is_used_polygon(self) -> bool {
        USED_POLYGONS.contains(&self)
    }

    /// Numeric value of a `layer=*` tag.
    pub fn layer(self) -> Option<i8> {
        match self {
            Tag::LayerM5 => Some(-5),
            Tag::LayerM4 => Some(-4),
            Tag::LayerM3 => Some(-3),
            Tag::LayerM2 => Some(-2),
            Tag::LayerM1 => Some(-1),
            Tag::Layer0 => Some(0),
            Tag::Layer1 => Some(1),
            Tag::Layer2 => Some(2),
            Tag::Layer3 => Some(3),
            Tag::Layer4 => Some(4),
            Tag::Layer5 => Some(5),
            _ => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}={}", self.key(), self.value())
    }
}
