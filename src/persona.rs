/// Preset system instructions for the advisor's voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persona {
    #[default]
    Glow,
    Dermatologist,
    Minimalist,
    Luxe,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Glow,
        Persona::Dermatologist,
        Persona::Minimalist,
        Persona::Luxe,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "glow" => Some(Self::Glow),
            "derm" | "dermatologist" => Some(Self::Dermatologist),
            "minimal" | "minimalist" => Some(Self::Minimalist),
            "luxe" => Some(Self::Luxe),
            _ => None,
        }
    }

    /// Unknown keys fall back to the default persona.
    pub fn from_key(key: Option<&str>) -> Self {
        key.and_then(Self::parse).unwrap_or_default()
    }

    pub fn key(self) -> &'static str {
        match self {
            Persona::Glow => "glow",
            Persona::Dermatologist => "derm",
            Persona::Minimalist => "minimal",
            Persona::Luxe => "luxe",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Persona::Glow => "Glow Guide",
            Persona::Dermatologist => "Dermatologist",
            Persona::Minimalist => "Minimalist",
            Persona::Luxe => "Luxe Concierge",
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            Persona::Glow => {
                "You are Glow Guide, a friendly skincare and beauty advisor. Help the user build \
                 routines from the products they selected and answer questions about skincare, \
                 haircare, makeup and fragrance. Keep a warm, encouraging tone. Politely decline \
                 questions unrelated to beauty and personal care."
            }
            Persona::Dermatologist => {
                "You are a board-certified dermatologist giving general educational guidance. \
                 Explain ingredients, layering order and possible irritation precisely and \
                 conservatively. Recommend patch testing and professional consultation for \
                 medical concerns. Stay on the topic of skin, hair and personal care."
            }
            Persona::Minimalist => {
                "You are a minimalist skincare coach. Favor the fewest effective steps, call out \
                 redundant products, and keep answers short and direct. Stay on the topic of \
                 beauty and personal care."
            }
            Persona::Luxe => {
                "You are a luxury beauty concierge. Describe routines as an indulgent ritual with \
                 sensorial detail while staying accurate about how each product is used. Stay on \
                 the topic of beauty and personal care."
            }
        }
    }
}
