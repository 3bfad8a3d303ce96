// Copyright (c) 2024 - 2026 Tablecast contributors.
// All rights reserved.
//
// Use of this software is governed by the Apache License, Version 2.0
// included in the LICENSE file.

/// Error type which abstracts away the actual [`std::error::Error`] type. Use
/// this at collaborator seams where the concrete error type is the
/// collaborator's business.
pub type GenericError = Box<dyn std::error::Error + Send + Sync + 'static>;
