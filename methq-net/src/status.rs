use std::fmt::{self, Display};

/// Wire status codes carried in the response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Status {
    Ok = 0,
    BadRequest = 1,
    InvalidMethylomeName = 2,
    MethylomeNotFound = 3,
    IndexNotFound = 4,
    BinSizeTooSmall = 5,
    TooManyIntervals = 6,
    UnsortedIntervals = 7,
    ServerFailure = 8,
    InactiveTimeout = 9,
}

impl Status {
    pub fn from_u32(value: u32) -> Option<Status> {
        match value {
            0 => Some(Status::Ok),
            1 => Some(Status::BadRequest),
            2 => Some(Status::InvalidMethylomeName),
            3 => Some(Status::MethylomeNotFound),
            4 => Some(Status::IndexNotFound),
            5 => Some(Status::BinSizeTooSmall),
            6 => Some(Status::TooManyIntervals),
            7 => Some(Status::UnsortedIntervals),
            8 => Some(Status::ServerFailure),
            9 => Some(Status::InactiveTimeout),
            _ => None,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Status::Ok => "ok",
            Status::BadRequest => "bad request",
            Status::InvalidMethylomeName => "invalid methylome name",
            Status::MethylomeNotFound => "methylome not found",
            Status::IndexNotFound => "index not found",
            Status::BinSizeTooSmall => "bin size too small",
            Status::TooManyIntervals => "too many intervals",
            Status::UnsortedIntervals => "intervals not sorted",
            Status::ServerFailure => "server failure",
            Status::InactiveTimeout => "inactive timeout",
        };
        write!(f, "{}", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_round_trip_all_codes() {
        for code in 0..10u32 {
            let status = Status::from_u32(code).unwrap();
            assert_eq!(status as u32, code);
        }
        assert_eq!(Status::from_u32(10), None);
        assert_eq!(Status::from_u32(u32::MAX), None);
    }

    #[rstest]
    fn test_is_ok() {
        assert!(Status::Ok.is_ok());
        assert!(!Status::ServerFailure.is_ok());
    }
}
