use crate::error::CriteriaError;

/// Oldest first-registration year the marketplace accepts
pub const MIN_YEAR: u32 = 1900;

/// Marketplace category to search in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Category {
    #[default]
    Vehicles,
    RealEstate,
}

impl Category {
    /// Path component after `/s-`
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Vehicles => "autos",
            Category::RealEstate => "immobilien",
        }
    }

    /// Trailing category code of a search URL
    pub fn suffix(&self) -> &'static str {
        match self {
            Category::Vehicles => "k0c216",
            Category::RealEstate => "k0",
        }
    }
}

/// German federal states
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Region {
    BadenWuerttemberg,
    Bayern,
    Berlin,
    Brandenburg,
    Bremen,
    Hamburg,
    Hessen,
    MecklenburgVorpommern,
    Niedersachsen,
    NordrheinWestfalen,
    RheinlandPfalz,
    Saarland,
    Sachsen,
    SachsenAnhalt,
    SchleswigHolstein,
    Thueringen,
}

impl Region {
    pub fn slug(&self) -> &'static str {
        match self {
            Region::BadenWuerttemberg => "baden-wuerttemberg",
            Region::Bayern => "bayern",
            Region::Berlin => "berlin",
            Region::Brandenburg => "brandenburg",
            Region::Bremen => "bremen",
            Region::Hamburg => "hamburg",
            Region::Hessen => "hessen",
            Region::MecklenburgVorpommern => "mecklenburg-vorpommern",
            Region::Niedersachsen => "niedersachsen",
            Region::NordrheinWestfalen => "nordrhein-westfalen",
            Region::RheinlandPfalz => "rheinland-pfalz",
            Region::Saarland => "saarland",
            Region::Sachsen => "sachsen",
            Region::SachsenAnhalt => "sachsen-anhalt",
            Region::SchleswigHolstein => "schleswig-holstein",
            Region::Thueringen => "thueringen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SellerType {
    Private,
    Commercial,
}

impl SellerType {
    pub fn slug(&self) -> &'static str {
        match self {
            SellerType::Private => "privat",
            SellerType::Commercial => "gewerblich",
        }
    }
}

/// Vehicle body type filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BodyType {
    Coupe,
    Convertible,
    Wagon,
}

impl BodyType {
    pub fn slug(&self) -> &'static str {
        match self {
            BodyType::Coupe => "coupe",
            BodyType::Convertible => "cabrio",
            BodyType::Wagon => "kombi",
        }
    }
}

/// Inclusive integer range with optional bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntRange {
    min: Option<u32>,
    max: Option<u32>,
}

impl IntRange {
    pub fn new(field: &'static str, min: Option<u32>, max: Option<u32>) -> Result<Self, CriteriaError> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(CriteriaError::InvertedRange { field, min, max });
            }
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Option<u32> {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Search parameters for one scrape run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    query: String,
    category: Category,
    region: Option<Region>,
    seller: Option<SellerType>,
    price: IntRange,
    year: IntRange,
    mileage: IntRange,
    power: IntRange,
    body: Option<BodyType>,
}

impl SearchCriteria {
    pub fn builder(query: impl Into<String>, category: Category) -> SearchCriteriaBuilder {
        SearchCriteriaBuilder {
            query: query.into(),
            category,
            ..Default::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    pub fn seller(&self) -> Option<SellerType> {
        self.seller
    }

    pub fn price(&self) -> IntRange {
        self.price
    }

    pub fn year(&self) -> IntRange {
        self.year
    }

    pub fn mileage(&self) -> IntRange {
        self.mileage
    }

    pub fn power(&self) -> IntRange {
        self.power
    }

    pub fn body(&self) -> Option<BodyType> {
        self.body
    }
}

/// Collects raw criteria values; validation happens in [`SearchCriteriaBuilder::build`]
#[derive(Debug, Clone, Default)]
pub struct SearchCriteriaBuilder {
    query: String,
    category: Category,
    region: Option<Region>,
    seller: Option<SellerType>,
    price: (Option<u32>, Option<u32>),
    year: (Option<u32>, Option<u32>),
    mileage: (Option<u32>, Option<u32>),
    power: (Option<u32>, Option<u32>),
    body: Option<BodyType>,
}

impl SearchCriteriaBuilder {
    pub fn region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    pub fn seller(mut self, seller: Option<SellerType>) -> Self {
        self.seller = seller;
        self
    }

    pub fn price(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.price = (min, max);
        self
    }

    pub fn year(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.year = (min, max);
        self
    }

    pub fn mileage(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.mileage = (min, max);
        self
    }

    pub fn power(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.power = (min, max);
        self
    }

    pub fn body(mut self, body: Option<BodyType>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Result<SearchCriteria, CriteriaError> {
        for year in [self.year.0, self.year.1].into_iter().flatten() {
            if year < MIN_YEAR {
                return Err(CriteriaError::YearTooEarly(year));
            }
        }

        Ok(SearchCriteria {
            query: self.query.trim().to_string(),
            category: self.category,
            region: self.region,
            seller: self.seller,
            price: IntRange::new("price", self.price.0, self.price.1)?,
            year: IntRange::new("year", self.year.0, self.year.1)?,
            mileage: IntRange::new("mileage", self.mileage.0, self.mileage.1)?,
            power: IntRange::new("power", self.power.0, self.power.1)?,
            body: self.body,
        })
    }
}
