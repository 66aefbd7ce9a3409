// Heuristic header-to-column resolution.
//
// The sheet has no schema contract: columns arrive in arbitrary order, with
// pt-BR or English names, with or without units in parentheses. Each logical
// field carries a list of keyword synonyms and matching runs in ordered
// passes (exact first, then substring) so a header like `Investimento (BRL)`
// still resolves to `spend`. A field with no matching header is simply
// absent; callers default it to zero or to the promo sentinel.

/// Logical fields the ingestion pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Date,
    Spend,
    Impressions,
    Clicks,
    Installs,
    Purchases,
    Cpm,
    Ctr,
    Cpa,
    Cpi,
    ConversionRate,
    InstallRate,
    TitleCost,
    Revenue,
    Promo,
    Clients,
}

/// Keyword synonyms per logical field, all pre-normalized (lowercase).
fn synonyms(field: Field) -> &'static [&'static str] {
    match field {
        Field::Date => &["data", "date", "dia"],
        Field::Spend => &["investimento", "valor gasto", "spend"],
        Field::Impressions => &["impressoes", "impressões", "impressions"],
        Field::Clicks => &["cliques", "clicks"],
        Field::Installs => &["instalações", "instalacoes", "installs"],
        Field::Purchases => &["compras", "purchases", "vendas"],
        Field::Cpm => &["cpm"],
        Field::Ctr => &["ctr"],
        Field::Cpa => &["cpa"],
        Field::Cpi => &["cpi"],
        Field::ConversionRate => &[
            "tx de conversão",
            "tx de conversao",
            "taxa de conversao",
            "conv rate",
        ],
        Field::InstallRate => &[
            "tx de instalações",
            "tx de instalacoes",
            "taxa de instalacoes",
            "install rate",
        ],
        Field::TitleCost => &[
            "custo título",
            "custo titulo",
            "custo do titulo",
            "titulo cost",
        ],
        Field::Revenue => &["receita", "revenue", "faturamento"],
        Field::Promo => &["promo", "promoção", "promocao"],
        Field::Clients => &["clientes", "clientes únicos", "unique users", "usuarios"],
    }
}

/// Ordered matching strategies. Exact equality wins over containment so a
/// `CPA` header is never shadowed by a `CPA alvo` one sitting to its left.
#[derive(Debug, Clone, Copy)]
enum MatchPass {
    Exact,
    Contains,
}

const MATCH_PASSES: [MatchPass; 2] = [MatchPass::Exact, MatchPass::Contains];

fn normalize(cell: &str) -> String {
    cell.trim().to_lowercase()
}

/// Resolve one logical field against a header row. `None` means the field
/// is absent from this sheet, which is not an error.
pub fn find_column(headers: &[String], field: Field) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
    let terms = synonyms(field);
    for pass in MATCH_PASSES {
        let hit = normalized.iter().position(|header| {
            terms.iter().any(|term| match pass {
                MatchPass::Exact => header == term,
                MatchPass::Contains => header.contains(term),
            })
        });
        if hit.is_some() {
            return hit;
        }
    }
    None
}

/// All resolved column indices for one header row.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub spend: Option<usize>,
    pub impressions: Option<usize>,
    pub clicks: Option<usize>,
    pub installs: Option<usize>,
    pub purchases: Option<usize>,
    pub cpm: Option<usize>,
    pub ctr: Option<usize>,
    pub cpa: Option<usize>,
    pub cpi: Option<usize>,
    pub conversion_rate: Option<usize>,
    pub install_rate: Option<usize>,
    pub title_cost: Option<usize>,
    pub revenue: Option<usize>,
    pub promo: Option<usize>,
    pub clients: Option<usize>,
}

impl ColumnMap {
    /// Names of logical fields that did not resolve, for load diagnostics.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let entries: [(&'static str, Option<usize>); 16] = [
            ("date", self.date),
            ("spend", self.spend),
            ("impressions", self.impressions),
            ("clicks", self.clicks),
            ("installs", self.installs),
            ("purchases", self.purchases),
            ("cpm", self.cpm),
            ("ctr", self.ctr),
            ("cpa", self.cpa),
            ("cpi", self.cpi),
            ("conversion_rate", self.conversion_rate),
            ("install_rate", self.install_rate),
            ("title_cost", self.title_cost),
            ("revenue", self.revenue),
            ("promo", self.promo),
            ("clients", self.clients),
        ];
        entries
            .into_iter()
            .filter_map(|(name, idx)| idx.is_none().then_some(name))
            .collect()
    }

    pub fn resolve(headers: &[String]) -> Self {
        ColumnMap {
            date: find_column(headers, Field::Date),
            spend: find_column(headers, Field::Spend),
            impressions: find_column(headers, Field::Impressions),
            clicks: find_column(headers, Field::Clicks),
            installs: find_column(headers, Field::Installs),
            purchases: find_column(headers, Field::Purchases),
            cpm: find_column(headers, Field::Cpm),
            ctr: find_column(headers, Field::Ctr),
            cpa: find_column(headers, Field::Cpa),
            cpi: find_column(headers, Field::Cpi),
            conversion_rate: find_column(headers, Field::ConversionRate),
            install_rate: find_column(headers, Field::InstallRate),
            title_cost: find_column(headers, Field::TitleCost),
            revenue: find_column(headers, Field::Revenue),
            promo: find_column(headers, Field::Promo),
            clients: find_column(headers, Field::Clients),
        }
    }
}
