/// Spatial functions and predicates the emitter knows, as (lowercase canonical name, name as
/// MySQL spells it in documentation).
pub const SPATIAL_FUNCTIONS: [(&str, &str); 20] = [
    ("st_contains", "ST_Contains"),
    ("st_crosses", "ST_Crosses"),
    ("st_disjoint", "ST_Disjoint"),
    ("st_distance", "ST_Distance"),
    ("st_distance_sphere", "ST_Distance_Sphere"),
    ("st_equals", "ST_Equals"),
    ("st_intersects", "ST_Intersects"),
    ("st_overlaps", "ST_Overlaps"),
    ("st_touches", "ST_Touches"),
    ("st_within", "ST_Within"),
    ("st_area", "ST_Area"),
    ("st_length", "ST_Length"),
    ("st_buffer", "ST_Buffer"),
    ("st_centroid", "ST_Centroid"),
    ("st_envelope", "ST_Envelope"),
    ("st_geomfromtext", "ST_GeomFromText"),
    ("st_geomfromwkb", "ST_GeomFromWKB"),
    ("st_astext", "ST_AsText"),
    ("st_asbinary", "ST_AsBinary"),
    ("st_srid", "ST_SRID"),
];

/// Look up the engine spelling of a spatial function, ignoring case. `None` means the name is not
/// a spatial construct.
pub fn canonical_function_name(name: &str) -> Option<&'static str> {
    SPATIAL_FUNCTIONS
        .iter()
        .find(|(canonical, _)| canonical.eq_ignore_ascii_case(name))
        .map(|(_, engine)| *engine)
}
