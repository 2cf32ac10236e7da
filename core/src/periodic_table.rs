use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown element symbol '{0}'")]
pub struct UnknownElement(pub String);

macro_rules! elements {
    ($($symbol:ident = $number:literal, $polarization:literal;)*) => {
        /// The elements supported by this crate. The discriminant is the atomic number.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(u32)]
        pub enum ElementType {
            $($symbol = $number,)*
        }

        impl ElementType {
            const ALL: &'static [ElementType] = &[$(ElementType::$symbol,)*];

            /// The canonical (capitalized) symbol of this element
            pub fn symbol(self) -> &'static str {
                match self {
                    $(ElementType::$symbol => stringify!($symbol),)*
                }
            }

            /// Number of unpaired electrons in the ground state of the neutral atom
            pub fn polarization(self) -> u32 {
                match self {
                    $(ElementType::$symbol => $polarization,)*
                }
            }
        }
    };
}

elements! {
    H = 1, 1;
    He = 2, 0;
    Li = 3, 1;
    Be = 4, 0;
    B = 5, 1;
    C = 6, 2;
    N = 7, 3;
    O = 8, 2;
    F = 9, 1;
    Ne = 10, 0;
    Na = 11, 1;
    Mg = 12, 0;
    Al = 13, 1;
    Si = 14, 2;
    P = 15, 3;
    S = 16, 2;
    Cl = 17, 1;
    Ar = 18, 0;
    K = 19, 1;
    Ca = 20, 0;
    Sc = 21, 1;
    Ti = 22, 2;
    V = 23, 3;
    Cr = 24, 6;
    Mn = 25, 5;
    Fe = 26, 4;
    Co = 27, 3;
    Ni = 28, 2;
    Cu = 29, 1;
    Zn = 30, 0;
    Ga = 31, 1;
    Ge = 32, 2;
    As = 33, 3;
    Se = 34, 2;
    Br = 35, 1;
    Kr = 36, 0;
}

impl ElementType {
    pub fn atomic_number(self) -> u32 {
        self as u32
    }

    pub fn from_atomic_number(number: u32) -> Option<Self> {
        Self::ALL.get((number as usize).checked_sub(1)?).copied()
    }

    /// Parses an element symbol regardless of case, so `"CL"`, `"cl"` and `"Cl"` all
    /// map to chlorine.
    pub fn from_symbol(symbol: &str) -> Result<Self, UnknownElement> {
        let canonical = capitalize(symbol.trim());
        Self::ALL
            .iter()
            .copied()
            .find(|element| element.symbol() == canonical)
            .ok_or_else(|| UnknownElement(symbol.to_owned()))
    }
}

impl FromStr for ElementType {
    type Err = UnknownElement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn capitalize(symbol: &str) -> String {
    let lower = symbol.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_case_insensitive() {
        assert_eq!(ElementType::from_symbol("CL"), Ok(ElementType::Cl));
        assert_eq!(ElementType::from_symbol("h"), Ok(ElementType::H));
        assert_eq!("Li".parse::<ElementType>(), Ok(ElementType::Li));
        assert!(ElementType::from_symbol("Xx").is_err());
        assert!(ElementType::from_symbol("").is_err());
    }

    #[test]
    fn atomic_numbers_round_trip() {
        for number in 1..=36 {
            let element = ElementType::from_atomic_number(number).unwrap();
            assert_eq!(element.atomic_number(), number);
        }
        assert_eq!(ElementType::from_atomic_number(0), None);
        assert_eq!(ElementType::from_atomic_number(37), None);
    }

    #[test]
    fn polarization_of_ground_states() {
        assert_eq!(ElementType::H.polarization(), 1);
        assert_eq!(ElementType::O.polarization(), 2);
        assert_eq!(ElementType::N.polarization(), 3);
        assert_eq!(ElementType::Cr.polarization(), 6);
        assert_eq!(ElementType::Ne.polarization(), 0);
    }
}
