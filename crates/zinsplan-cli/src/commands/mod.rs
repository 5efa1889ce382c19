pub mod zinsplan;
