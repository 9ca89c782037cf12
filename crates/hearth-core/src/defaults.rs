//! Built-in category table and common units.
//!
//! The table is immutable and ordered: rule order decides ties in the
//! categorizer, so entries must stay in this sequence. Tenants get their
//! own mutable copy the first time their categories are read (see
//! [`crate::categories::seed_default_categories`]).

use chrono::{DateTime, Utc};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::categorize::CategoryRule;
use crate::models::ShoppingCategory;

/// Icon for categories created without one.
pub const DEFAULT_ICON: &str = "\u{1f4e6}";
/// Color for categories created without one.
pub const DEFAULT_COLOR: &str = "#6b7280";

/// One entry of the built-in category table.
#[derive(Debug, Clone, Copy)]
pub struct DefaultCategory {
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
    pub keywords: &'static [&'static str],
}

pub static DEFAULT_CATEGORIES: &[DefaultCategory] = &[
    DefaultCategory {
        name: "Produce",
        icon: "\u{1f96c}",
        color: "#22c55e",
        keywords: &[
            "apple", "banana", "orange", "lemon", "lime", "grape", "strawberry", "blueberry",
            "raspberry", "mango", "pear", "peach", "plum", "cherry", "melon", "watermelon",
            "pineapple", "kiwi", "avocado", "tomato", "potato", "onion", "garlic", "carrot",
            "broccoli", "cauliflower", "cabbage", "lettuce", "spinach", "kale", "cucumber",
            "pepper", "courgette", "zucchini", "aubergine", "eggplant", "mushroom", "celery",
            "leek", "spring onion", "sweetcorn", "corn", "peas", "beans", "asparagus",
            "beetroot", "parsnip", "swede", "turnip", "radish", "ginger", "chilli", "herbs",
            "basil", "parsley", "coriander", "mint", "rosemary", "thyme", "sage",
        ],
    },
    DefaultCategory {
        name: "Dairy",
        icon: "\u{1f95b}",
        color: "#60a5fa",
        keywords: &[
            "milk", "cheese", "yogurt", "yoghurt", "butter", "cream", "creme fraiche",
            "sour cream", "cottage cheese", "cream cheese", "mozzarella", "cheddar", "parmesan",
            "brie", "camembert", "feta", "halloumi", "gouda", "edam", "double cream",
            "single cream", "clotted cream", "custard", "fromage frais",
        ],
    },
    DefaultCategory {
        name: "Meat",
        icon: "\u{1f969}",
        color: "#ef4444",
        keywords: &[
            "chicken", "beef", "pork", "lamb", "mince", "steak", "sausage", "bacon", "ham",
            "turkey", "duck", "goose", "venison", "rabbit", "gammon", "pork chop", "lamb chop",
            "chicken breast", "chicken thigh", "chicken wing", "beef joint", "pork joint",
            "lamb joint", "roast", "burger", "meatball",
        ],
    },
    DefaultCategory {
        name: "Fish",
        icon: "\u{1f41f}",
        color: "#0ea5e9",
        keywords: &[
            "salmon", "cod", "haddock", "tuna", "mackerel", "sardine", "trout", "sea bass",
            "plaice", "sole", "prawns", "shrimp", "crab", "lobster", "mussels", "clams",
            "oysters", "squid", "calamari", "fish fingers", "fish cake", "smoked salmon",
            "smoked haddock", "kippers",
        ],
    },
    DefaultCategory {
        name: "Bakery",
        icon: "\u{1f35e}",
        color: "#f59e0b",
        keywords: &[
            "bread", "rolls", "baguette", "ciabatta", "sourdough", "pitta", "naan", "wrap",
            "tortilla", "croissant", "pain au chocolat", "brioche", "bagel", "muffin", "scone",
            "crumpet", "pancake", "waffle", "cake", "brownie", "cookie", "biscuit", "pastry",
            "pie", "tart", "doughnut", "donut",
        ],
    },
    DefaultCategory {
        name: "Frozen",
        icon: "\u{1f9ca}",
        color: "#06b6d4",
        keywords: &[
            "frozen", "ice cream", "ice lolly", "frozen pizza", "frozen chips", "frozen peas",
            "frozen vegetables", "frozen fruit", "frozen fish", "frozen chicken", "frozen meal",
            "ready meal", "sorbet", "gelato",
        ],
    },
    DefaultCategory {
        name: "Drinks",
        icon: "\u{1f964}",
        color: "#8b5cf6",
        keywords: &[
            "water", "juice", "orange juice", "apple juice", "squash", "cordial", "cola",
            "coke", "pepsi", "lemonade", "sprite", "fanta", "energy drink", "tea", "coffee",
            "hot chocolate", "beer", "wine", "cider", "spirits", "gin", "vodka", "whisky",
            "rum", "prosecco", "champagne", "smoothie",
        ],
    },
    DefaultCategory {
        name: "Pantry",
        icon: "\u{1f96b}",
        color: "#78716c",
        keywords: &[
            "pasta", "spaghetti", "penne", "rice", "noodles", "couscous", "quinoa", "flour",
            "sugar", "salt", "pepper", "oil", "olive oil", "vegetable oil", "vinegar",
            "soy sauce", "worcestershire", "ketchup", "mayonnaise", "mustard", "honey", "jam",
            "marmalade", "peanut butter", "nutella", "marmite", "cereal", "porridge", "oats",
            "cornflakes", "bran flakes", "muesli", "baked beans", "tinned tomatoes",
            "chopped tomatoes", "tomato puree", "coconut milk", "stock", "gravy", "soup",
            "crisps", "nuts", "dried fruit",
        ],
    },
    DefaultCategory {
        name: "Eggs",
        icon: "\u{1f95a}",
        color: "#fef3c7",
        keywords: &[
            "eggs", "egg", "free range eggs", "organic eggs",
        ],
    },
    DefaultCategory {
        name: "Household",
        icon: "\u{1f9f9}",
        color: "#a78bfa",
        keywords: &[
            "toilet paper", "kitchen roll", "tissues", "bin bags", "cling film", "foil",
            "baking paper", "washing up liquid", "dishwasher tablets", "laundry detergent",
            "fabric softener", "bleach", "surface cleaner", "floor cleaner", "sponge", "cloth",
            "mop", "brush", "soap", "hand wash", "shampoo", "conditioner", "shower gel",
            "toothpaste", "deodorant",
        ],
    },
    DefaultCategory {
        name: "Baby",
        icon: "\u{1f476}",
        color: "#fda4af",
        keywords: &[
            "nappies", "diapers", "baby wipes", "baby food", "formula", "baby milk",
        ],
    },
    DefaultCategory {
        name: "Pet",
        icon: "\u{1f43e}",
        color: "#ca8a04",
        keywords: &[
            "dog food", "cat food", "pet food", "cat litter", "dog treats", "cat treats",
        ],
    },
    DefaultCategory {
        name: "Other",
        icon: "\u{1f4e6}",
        color: "#6b7280",
        keywords: &[],
    },
];

pub static COMMON_UNITS: &[&str] = &[
    "kg", "g", "lb", "oz", "l", "ml", "pint", "pt", "pack", "packet", "bag", "box", "tin",
    "can", "jar", "bottle", "carton", "bunch", "head", "clove", "slice", "piece", "dozen",
    "half dozen", "roll", "sheet", "loaf",
];

/// The built-in table as categorizer rules, built once per process.
pub fn default_rules() -> &'static [CategoryRule] {
    static RULES: OnceLock<Vec<CategoryRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        DEFAULT_CATEGORIES
            .iter()
            .enumerate()
            .map(|(idx, cat)| CategoryRule {
                name: cat.name.to_string(),
                keywords: cat.keywords.iter().map(|k| k.to_string()).collect(),
                sort_order: idx as i64,
            })
            .collect()
    })
}

pub fn default_category_names() -> Vec<&'static str> {
    DEFAULT_CATEGORIES.iter().map(|c| c.name).collect()
}

/// Fresh per-tenant rows copied from the built-in table.
///
/// `sort_order` is the table position; every row is flagged `is_default`.
pub fn default_category_rows(tenant_id: Uuid, now: DateTime<Utc>) -> Vec<ShoppingCategory> {
    DEFAULT_CATEGORIES
        .iter()
        .enumerate()
        .map(|(idx, cat)| ShoppingCategory {
            id: Uuid::new_v4(),
            tenant_id,
            name: cat.name.to_string(),
            icon: cat.icon.to_string(),
            color: cat.color.to_string(),
            keywords: cat.keywords.iter().map(|k| k.to_string()).collect(),
            sort_order: idx as i64,
            is_default: true,
            created_at: now,
            updated_at: now,
        })
        .collect()
}
