use std::fs::File;
use std::path::Path;

use mfh_csv::CsvWriterConfig;
use mfh_harvester::{parse_name_list, HarvestConfig, Place, Query, QueryTemplate};
use mfh_webdriver::WebDriverConfig;
use serde::{Deserialize, Serialize};

use crate::HarvestArgs;

/// Everything a harvest run can be configured with from a yaml file.
///
/// Harvest settings sit at the top level, csv dialect and WebDriver connection in their own
/// sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MfhConfig {
    #[serde(flatten)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub csv: CsvWriterConfig,
    #[serde(default)]
    pub webdriver: WebDriverConfig,
}

impl MfhConfig {
    /// Reads `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(file) = path.map(File::open) {
            Ok(serde_yaml::from_reader(file?)?)
        } else {
            Ok(MfhConfig::default())
        }
    }
}

impl TryFrom<&HarvestArgs> for MfhConfig {
    type Error = anyhow::Error;

    fn try_from(args: &HarvestArgs) -> Result<Self, Self::Error> {
        let mut conf = MfhConfig::load(args.config.as_deref())?;
        if let Some(concurrency) = args.concurrency {
            conf.harvest.concurrency = concurrency;
        }
        if let Some(cooldown_ms) = args.cooldown_ms {
            conf.harvest.cooldown_ms = cooldown_ms;
        }
        if let Some(retries) = args.retries {
            conf.harvest.retries = retries;
        }
        if let Some(max_scrolls) = args.max_scrolls {
            conf.harvest.max_scrolls = max_scrolls;
        }
        if let Some(query_template) = &args.query_template {
            conf.harvest.query_template = query_template.to_string();
        }
        if let Some(webdriver_url) = &args.webdriver_url {
            conf.webdriver.server_url = webdriver_url.to_string();
        }
        if args.headed {
            conf.webdriver.headless = false;
        }
        Ok(conf)
    }
}

/// Reads the place list at `path` and turns it into queries.
///
/// `.yaml`/`.yml` files hold a list of `name:` entries or plain strings, anything else is read
/// as one name per line.
pub fn load_queries(path: &Path, template: &QueryTemplate) -> anyhow::Result<Vec<Query>> {
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    let queries = if is_yaml {
        let places: Vec<Place> = serde_yaml::from_reader(File::open(path)?)?;
        template.build(places)
    } else {
        let content = std::fs::read_to_string(path)?;
        template.build(parse_name_list(&content))
    };
    Ok(queries)
}
