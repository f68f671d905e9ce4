//! Built-in taxonomies for a dry-cleaning and laundry advertiser in the
//! UAE. Every list here can be replaced from the config file.

use crate::config::{BusinessService, CandidateKeyword, PlatformTarget, ServiceDefinition, Theme};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn theme(name: &str, terms: &[&str]) -> Theme {
    Theme {
        name: name.to_string(),
        terms: strings(terms),
    }
}

pub fn high_intent_phrases() -> Vec<String> {
    strings(&[
        "dry cleaning",
        "laundry service",
        "curtain cleaning",
        "sofa cleaning",
        "carpet cleaning",
        "express laundry",
        "same-day cleaning",
        "book now",
        "order online",
        "premium laundry",
        "cleaning service near me",
    ])
}

pub fn market_themes() -> Vec<Theme> {
    vec![
        theme("laundry", &["laundry", "dry cleaning", "wash", "ironing", "garment"]),
        theme("express", &["express", "same-day", "urgent", "rush", "quick", "24 hour"]),
        theme("location", &["dubai", "uae", "near me", "nearby", "service"]),
        theme("premium", &["premium", "luxury", "high-end", "professional"]),
        theme("sofa", &["sofa", "couch", "furniture", "upholstery"]),
        theme("carpet", &["carpet", "rug", "floor", "cleaning"]),
        theme("curtain", &["curtain", "drape", "blind", "window"]),
        theme("pickup", &["pickup", "delivery", "free delivery", "door-to-door"]),
        theme("corporate", &["corporate", "business", "office", "company"]),
    ]
}

pub fn candidate_keywords() -> Vec<CandidateKeyword> {
    [
        ("express laundry", "High-intent same-day laundry searches"),
        ("same-day dry cleaning", "Urgent laundry needs"),
        ("premium curtain cleaning", "High-value service upsell"),
        ("sofa cleaning near me", "Local furniture cleaning"),
        ("corporate laundry service", "B2B laundry opportunities"),
        ("carpet cleaning dubai", "Location-specific service"),
        ("laundry pickup delivery", "Convenience-focused searches"),
        ("eco-friendly dry cleaning", "Sustainability angle"),
        ("white shirt laundry", "Premium garment care"),
        ("wedding dress cleaning", "Special occasion services"),
    ]
    .iter()
    .map(|(keyword, intent)| CandidateKeyword {
        keyword: keyword.to_string(),
        intent: intent.to_string(),
    })
    .collect()
}

pub fn urgency_terms() -> Vec<String> {
    strings(&["express", "same-day", "pickup", "delivery"])
}

pub fn location_terms() -> Vec<String> {
    strings(&["dubai", "sharjah", "abu dhabi", "uae", "near me"])
}

pub fn location_suggestions() -> Vec<String> {
    strings(&[
        "dry cleaning dubai",
        "laundry service sharjah",
        "carpet cleaning abu dhabi",
        "cleaning service near me",
        "laundry pickup dubai",
    ])
}

pub fn core_services() -> Vec<String> {
    strings(&[
        "sofa cleaning",
        "carpet cleaning",
        "curtain cleaning",
        "corporate laundry",
    ])
}

pub fn website_services() -> Vec<ServiceDefinition> {
    let service = |id: &str, name: &str, url: &str, keywords: &[&str], related: &[&str]| {
        ServiceDefinition {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            keywords: strings(keywords),
            related_keywords: strings(related),
        }
    };
    vec![
        service(
            "dry_cleaning",
            "Dry Cleaning Services",
            "/services/dry-cleaning",
            &["dry cleaning", "dry clean", "professional dry cleaning", "premium dry cleaning"],
            &["laundry", "garment care", "clothing service"],
        ),
        service(
            "laundry",
            "Laundry Services",
            "/services/laundry",
            &["laundry", "laundry service", "wash", "ironing", "pressing"],
            &["express laundry", "same-day laundry", "quick laundry"],
        ),
        service(
            "curtain_cleaning",
            "Curtain & Blind Cleaning",
            "/services/curtains",
            &["curtain cleaning", "curtains", "blind cleaning", "window treatment cleaning"],
            &["drapes", "drapery cleaning", "blind cleaning", "sheer cleaning"],
        ),
        service(
            "sofa_cleaning",
            "Sofa & Upholstery Cleaning",
            "/services/sofa",
            &["sofa cleaning", "upholstery cleaning", "furniture cleaning", "couch cleaning"],
            &["armchair cleaning", "mattress cleaning", "fabric cleaning"],
        ),
        service(
            "carpet_cleaning",
            "Carpet & Rug Cleaning",
            "/services/carpet",
            &["carpet cleaning", "rug cleaning", "floor cleaning", "carpet care"],
            &["deep cleaning carpet", "stain removal", "steam cleaning"],
        ),
        service(
            "corporate_laundry",
            "Corporate & Business Laundry",
            "/services/corporate",
            &["corporate laundry", "business laundry", "office laundry", "uniform cleaning"],
            &["company laundry", "workplace cleaning", "hotel laundry"],
        ),
    ]
}

pub fn business_services() -> Vec<BusinessService> {
    let service = |name: &str, terms: &[&str], expected_importance: f64| BusinessService {
        name: name.to_string(),
        terms: strings(terms),
        expected_importance,
    };
    vec![
        service(
            "home_cleaning",
            &["home", "house", "residential", "villa", "apartment", "domestic"],
            0.35,
        ),
        service(
            "office_cleaning",
            &["office", "commercial", "corporate", "workplace", "business"],
            0.25,
        ),
        service("carpet_cleaning", &["carpet", "rug", "upholstery", "sofa"], 0.15),
        service(
            "deep_cleaning",
            &["deep", "sanitize", "disinfect", "thorough", "post-construction"],
            0.12,
        ),
        service(
            "window_cleaning",
            &["window", "glass", "facade", "blind", "exterior"],
            0.08,
        ),
        service(
            "moving_cleaning",
            &["moving", "post-move", "relocation", "end-of-lease", "move-out"],
            0.05,
        ),
    ]
}

pub fn platform_targets() -> Vec<PlatformTarget> {
    [
        ("Search", 0.40),
        ("Performance Max", 0.30),
        ("Android App", 0.15),
        ("iOS App", 0.15),
    ]
    .iter()
    .map(|(campaign_type, target_share)| PlatformTarget {
        campaign_type: campaign_type.to_string(),
        target_share: *target_share,
    })
    .collect()
}
