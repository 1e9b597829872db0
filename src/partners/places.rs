//! Kayak 地点格式化
//!
//! Kayak 路径里的地点只接受三种写法：
//! - IATA 代码：`BOS`
//! - 美国城市：`New-York-City,NY`
//! - 其他城市：`Barcelona,Spain`
//!
//! 自由文本没有权威的国家字段，只能靠关键字猜测是否在美国，
//! 歧义城市名（例如包含 "us" 子串的名字）会被归到美国格式。

/// `,XX` 州缩写
const US_STATE_SUFFIXES: &[&str] = &[
    ",ny", ",ca", ",fl", ",tx", ",il", ",pa", ",oh", ",ga", ",nc", ",mi", ",nj", ",va", ",wa",
    ",az", ",ma", ",tn", ",in", ",mo", ",md", ",wi", ",co", ",mn", ",sc", ",al", ",la", ",ky",
    ",or", ",ok", ",ct", ",ut", ",ia", ",nv", ",ar", ",ms", ",ks", ",nm", ",ne", ",wv", ",id",
    ",hi", ",nh", ",me", ",mt", ",ri", ",de", ",sd", ",nd", ",ak", ",vt", ",wy", ",dc",
];

const US_STATE_NAMES: &[&str] = &[
    "new york",
    "california",
    "florida",
    "texas",
    "illinois",
    "pennsylvania",
    "ohio",
    "georgia",
    "north carolina",
    "michigan",
    "new jersey",
    "virginia",
    "washington",
    "arizona",
    "massachusetts",
    "tennessee",
    "indiana",
    "missouri",
    "maryland",
    "wisconsin",
    "colorado",
    "minnesota",
    "south carolina",
    "alabama",
    "louisiana",
    "kentucky",
    "oregon",
    "oklahoma",
    "connecticut",
    "utah",
    "iowa",
    "nevada",
    "arkansas",
    "mississippi",
    "kansas",
    "new mexico",
    "nebraska",
    "west virginia",
    "idaho",
    "hawaii",
    "new hampshire",
    "maine",
    "montana",
    "rhode island",
    "delaware",
    "south dakota",
    "north dakota",
    "alaska",
    "vermont",
    "wyoming",
];

/// "us" 作为子串匹配，与既有数据的行为保持一致
const US_COUNTRY_WORDS: &[&str] = &["united states", "usa", "us", "america"];

/// 无逗号时用来补州缩写的大城市表（key 为小写、连字符分隔）
const CITY_STATES: &[(&str, &str)] = &[
    ("hillsdale", "MI"),
    ("new-york", "NY"),
    ("los-angeles", "CA"),
    ("chicago", "IL"),
    ("houston", "TX"),
    ("phoenix", "AZ"),
    ("philadelphia", "PA"),
    ("san-antonio", "TX"),
    ("san-diego", "CA"),
    ("dallas", "TX"),
    ("san-jose", "CA"),
    ("austin", "TX"),
    ("jacksonville", "FL"),
    ("fort-worth", "TX"),
    ("columbus", "OH"),
    ("charlotte", "NC"),
    ("san-francisco", "CA"),
    ("indianapolis", "IN"),
    ("seattle", "WA"),
    ("denver", "CO"),
    ("washington", "DC"),
    ("boston", "MA"),
    ("el-paso", "TX"),
    ("nashville", "TN"),
    ("detroit", "MI"),
    ("oklahoma-city", "OK"),
    ("portland", "OR"),
    ("las-vegas", "NV"),
    ("memphis", "TN"),
    ("louisville", "KY"),
    ("baltimore", "MD"),
    ("milwaukee", "WI"),
    ("albuquerque", "NM"),
    ("tucson", "AZ"),
    ("fresno", "CA"),
    ("sacramento", "CA"),
    ("atlanta", "GA"),
    ("kansas-city", "MO"),
    ("long-beach", "CA"),
    ("colorado-springs", "CO"),
    ("raleigh", "NC"),
    ("miami", "FL"),
    ("virginia-beach", "VA"),
    ("omaha", "NE"),
    ("oakland", "CA"),
    ("minneapolis", "MN"),
    ("tulsa", "OK"),
    ("arlington", "TX"),
    ("tampa", "FL"),
    ("new-orleans", "LA"),
    ("wichita", "KS"),
    ("cleveland", "OH"),
    ("bakersfield", "CA"),
    ("aurora", "CO"),
    ("anaheim", "CA"),
    ("honolulu", "HI"),
    ("santa-ana", "CA"),
    ("corpus-christi", "TX"),
    ("riverside", "CA"),
    ("lexington", "KY"),
    ("stockton", "CA"),
    ("henderson", "NV"),
    ("saint-paul", "MN"),
    ("st-louis", "MO"),
    ("cincinnati", "OH"),
    ("pittsburgh", "PA"),
    ("greensboro", "NC"),
    ("anchorage", "AK"),
    ("plano", "TX"),
    ("lincoln", "NE"),
    ("orlando", "FL"),
    ("irvine", "CA"),
    ("newark", "NJ"),
    ("durham", "NC"),
    ("chula-vista", "CA"),
    ("toledo", "OH"),
    ("fort-wayne", "IN"),
    ("st-petersburg", "FL"),
    ("laredo", "TX"),
    ("jersey-city", "NJ"),
    ("chandler", "AZ"),
    ("madison", "WI"),
    ("lubbock", "TX"),
    ("scottsdale", "AZ"),
    ("reno", "NV"),
    ("buffalo", "NY"),
    ("gilbert", "AZ"),
    ("glendale", "AZ"),
    ("north-las-vegas", "NV"),
    ("winston-salem", "NC"),
    ("chesapeake", "VA"),
    ("norfolk", "VA"),
    ("fremont", "CA"),
    ("garland", "TX"),
    ("irving", "TX"),
    ("hialeah", "FL"),
    ("richmond", "VA"),
    ("boise", "ID"),
    ("spokane", "WA"),
    ("baton-rouge", "LA"),
    ("tacoma", "WA"),
    ("san-bernardino", "CA"),
    ("grand-rapids", "MI"),
    ("huntsville", "AL"),
    ("salt-lake-city", "UT"),
    ("fayetteville", "AR"),
    ("yonkers", "NY"),
    ("amarillo", "TX"),
    ("mckinney", "TX"),
    ("rochester", "NY"),
];

/// 格式化为 Kayak 路径段
pub fn format_location_for_kayak(identifier: &str) -> String {
    if identifier.len() == 3 && identifier.chars().all(|c| c.is_ascii_alphabetic()) {
        return identifier.to_ascii_uppercase();
    }

    let formatted = if is_location_in_us(identifier) {
        format_us_location(identifier)
    } else {
        format_non_us_location(identifier)
    };
    // 逗号后的段可能以 `-` 结尾，例如 "a,b-,c"
    formatted.trim_matches('-').to_string()
}

/// 关键字启发式判断是否为美国地点（大小写不敏感的子串匹配）
pub fn is_location_in_us(identifier: &str) -> bool {
    let lower = identifier.to_lowercase();
    US_STATE_SUFFIXES
        .iter()
        .chain(US_STATE_NAMES)
        .chain(US_COUNTRY_WORDS)
        .any(|indicator| lower.contains(indicator))
}

fn format_us_location(identifier: &str) -> String {
    let formatted = normalize(identifier);

    if let Some((city, rest)) = formatted.split_once(',') {
        // 只保留第二段作为州
        let state = rest.split(',').next().unwrap_or_default();
        return format!("{},{}", title_case(city), state.to_uppercase());
    }

    let key = formatted.to_lowercase();
    if let Some((_, state)) = CITY_STATES.iter().find(|(city, _)| *city == key) {
        return format!("{},{}", title_case(&formatted), state);
    }

    title_case(&formatted)
}

fn format_non_us_location(identifier: &str) -> String {
    let formatted = normalize(identifier);

    if let Some((city, rest)) = formatted.split_once(',') {
        let country = rest.split(',').next().unwrap_or_default();
        return format!("{},{}", title_case(city), title_case(country));
    }

    title_case(&formatted)
}

/// 空白 → `-`，剔除 ASCII 单词字符、`-`、`,` 以外的字符，
/// 合并连续 `-`，去掉首尾 `-`，合并连续 `,`
fn normalize(input: &str) -> String {
    let mut hyphenated = String::with_capacity(input.len());
    let mut in_space = false;
    for c in input.chars() {
        if c.is_whitespace() {
            if !in_space {
                hyphenated.push('-');
            }
            in_space = true;
        } else {
            in_space = false;
            hyphenated.push(c);
        }
    }

    let mut cleaned = String::with_capacity(hyphenated.len());
    for c in hyphenated.chars() {
        let keep = c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ',';
        if !keep {
            continue;
        }
        if c == '-' && cleaned.ends_with('-') {
            continue;
        }
        cleaned.push(c);
    }

    let trimmed = cleaned.strip_prefix('-').unwrap_or(&cleaned);
    let trimmed = trimmed.strip_suffix('-').unwrap_or(trimmed);

    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c == ',' && out.ends_with(',') {
            continue;
        }
        out.push(c);
    }
    out
}

/// 每个 `-` 分隔的单词首字母大写、其余小写
fn title_case(s: &str) -> String {
    s.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut w: String = first.to_uppercase().collect();
                    w.push_str(&chars.as_str().to_lowercase());
                    w
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
