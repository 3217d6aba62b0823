pub mod derive;
pub mod hybrid;
pub mod keywords;
pub mod normalize;
pub mod script;
pub mod similarity;
pub mod stopwords;
